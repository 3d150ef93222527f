//! # Target
//!
//! Logical dial target of the form `<Environment>/<ServiceName>`.

use once_cell::sync::Lazy;
use regex::Regex;
use snafu::prelude::Snafu;
use std::fmt;
use std::str::FromStr;

/// URI scheme handled by the Polaris resolver
pub const POLARIS_SCHEME: &str = "polaris";

static TARGET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Development|Production|Pre-release|Test)/([a-zA-Z0-9_:.-]{1,128})$")
        .expect("target pattern must compile")
});

/// Errors raised while validating a target
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum TargetError {
    /// The target does not look like `<Environment>/<ServiceName>`
    #[snafu(display("using invalid target: {target}"))]
    InvalidTarget {
        /// the rejected input
        target: String,
    },
}

/// A validated Polaris target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Polaris namespace, one of the four environments
    pub namespace: String,
    /// Name of the destination service
    pub service: String,
}

impl Target {
    /// Address handed to the dial path, `polaris://<namespace>/<service>`
    pub fn dial_uri(&self) -> String {
        format!("{}://{}", POLARIS_SCHEME, self)
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(target: &str) -> Result<Self, Self::Err> {
        let Some(captures) = TARGET_PATTERN.captures(target) else {
            return InvalidTargetSnafu { target }.fail();
        };

        Ok(Target {
            namespace: captures[1].to_owned(),
            service: captures[2].to_owned(),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_valid() {
        let target: Target = "Development/order-service".parse().unwrap();
        assert_eq!(target.namespace, "Development");
        assert_eq!(target.service, "order-service");
        assert_eq!(target.to_string(), "Development/order-service");
        assert_eq!(target.dial_uri(), "polaris://Development/order-service");
    }

    #[test]
    fn test_target_all_environments() {
        for env in ["Development", "Production", "Pre-release", "Test"] {
            let target: Target = format!("{env}/svc_1:a.b-c").parse().unwrap();
            assert_eq!(target.namespace, env);
            assert_eq!(target.service, "svc_1:a.b-c");
        }
    }

    #[test]
    fn test_target_invalid() {
        let result = "dev/order".parse::<Target>();
        assert_eq!(
            result,
            Err(TargetError::InvalidTarget {
                target: String::from("dev/order")
            })
        );

        assert!("Development/".parse::<Target>().is_err());
        assert!("Development/order service".parse::<Target>().is_err());
        assert!("Development/order/extra".parse::<Target>().is_err());
        assert!("order-service".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_service_length() {
        let longest = "a".repeat(128);
        assert!(format!("Test/{longest}").parse::<Target>().is_ok());
        let too_long = "a".repeat(129);
        assert!(format!("Test/{too_long}").parse::<Target>().is_err());
    }
}
