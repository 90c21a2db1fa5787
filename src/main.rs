#[tokio::main]
async fn main() {
    if let Err(e) = medispatch::run().await {
        eprintln!("medispatch failed: {e}");
        std::process::exit(1);
    }
}
