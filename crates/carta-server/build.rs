fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/extraction.proto");

    let mut config = prost_build::Config::new();
    config
        .protoc_executable(protoc_bin_vendored::protoc_bin_path()?)
        .bytes(["."]);

    tonic_build::configure()
        .build_client(false)
        .compile_protos_with_config(config, &["proto/extraction.proto"], &["proto"])?;

    Ok(())
}
