#[tokio::main]
async fn main() {
    if let Err(error) = grocery_list_lib::run().await {
        log::error!("grocery list server failed: {error}");
        eprintln!("grocery-list: {error}");
        std::process::exit(1);
    }
}
