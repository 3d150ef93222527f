//! build script to generate .rs from .proto

/// Regenerates `src/grpc.rs` from `proto/hello.proto`.
///
/// The generated file is checked in; without a `protoc` installation the build
/// keeps it as is.
fn main() {
    let proto_dir = "proto";
    let proto_file = format!("{}/hello.proto", proto_dir);
    println!("cargo:rerun-if-changed={}", proto_file);

    let generated = tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .out_dir("src/")
        .compile(&[proto_file.as_str()], &[proto_dir]);

    if let Err(e) = generated {
        println!(
            "cargo:warning=could not regenerate src/grpc.rs from {}: {}",
            proto_file, e
        );
    }
}
