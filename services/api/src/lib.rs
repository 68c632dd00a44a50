mod infra;
mod routes;
mod server;

use staff_feedback::error::AppError;

pub async fn run() -> Result<(), AppError> {
    server::run().await
}
