fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile proto files to OUT_DIR (used by tonic::include_proto!)
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/tally/v1/ledger.proto"], &["proto"])?;

    // Tell Cargo to rerun if proto files change
    println!("cargo:rerun-if-changed=proto/");

    Ok(())
}
