// src/main.rs
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    poll_site::start_server().await
}
