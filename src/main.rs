#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    csv_user_import::run().await
}
