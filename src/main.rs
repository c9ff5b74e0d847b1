#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = youtrack_helper::run().await {
        eprintln!("youtrack-helper: {}", err.user_message());
        std::process::exit(1);
    }
}
