fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(
            std::path::PathBuf::from(std::env::var("OUT_DIR")?).join("chord_descriptor.bin"),
        )
        .compile(&["proto/chord.proto"], &["proto"])?;
    Ok(())
}
