#[tokio::main]
async fn main() {
    if let Err(err) = qz_api::run().await {
        eprintln!("qz-api failed to start: {err}");
        std::process::exit(1);
    }
}
