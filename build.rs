use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=proto/auth.proto");

    let descriptors = protox::compile(["auth.proto"], ["proto"])?;
    tonic_build::configure().compile_fds(descriptors)?;

    Ok(())
}
