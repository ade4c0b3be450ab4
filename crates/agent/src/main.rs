use logrecord_agent::runtime::{boot, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (config, detector) = boot::boot()?;
    serve::serve(config, detector).await
}
