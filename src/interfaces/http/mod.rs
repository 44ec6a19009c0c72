use crate::application::UserImportUseCase;
use crate::domain::report::AgeReport;
use actix_cors::Cors;
use actix_web::{
    dev::Server, get, web, App, HttpResponse, HttpResponseBuilder, HttpServer, Responder,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const LIVENESS_MESSAGE: &str = "CSV → Postgres API is running";
const EMPTY_CSV_MESSAGE: &str = "CSV is empty or not found.";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

pub struct HttpState {
    pub use_case: Arc<UserImportUseCase>,
    pub csv_path: PathBuf,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub inserted: u64,
    pub report: AgeReport,
}

fn plain_text(mut builder: HttpResponseBuilder, body: impl Into<String>) -> HttpResponse {
    builder.content_type(PLAIN_TEXT).body(body.into())
}

#[get("/")]
async fn health() -> impl Responder {
    plain_text(HttpResponse::Ok(), LIVENESS_MESSAGE)
}

#[get("/upload")]
async fn upload(data: web::Data<HttpState>) -> impl Responder {
    info!(path = %data.csv_path.display(), "Upload requested");

    let records = match data.use_case.load_records(&data.csv_path).await {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Failed to read CSV");
            return plain_text(
                HttpResponse::InternalServerError(),
                format!("Error during upload: {}", e),
            );
        }
    };

    if records.is_empty() {
        warn!(path = %data.csv_path.display(), "CSV produced no rows");
        return plain_text(HttpResponse::BadRequest(), EMPTY_CSV_MESSAGE);
    }

    match data.use_case.import_and_report(&records).await {
        Ok(outcome) => HttpResponse::Ok().json(UploadResponse {
            message: "Upload complete".to_string(),
            inserted: outcome.inserted,
            report: outcome.report,
        }),
        Err(e) => {
            error!(error = %e, "Upload failed");
            plain_text(HttpResponse::InternalServerError(), format!("Error during upload: {}", e))
        }
    }
}

#[get("/users")]
async fn list_users(data: web::Data<HttpState>) -> impl Responder {
    match data.use_case.list_users().await {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => {
            error!(error = %e, "Failed to fetch users");
            plain_text(HttpResponse::InternalServerError(), "Error fetching users")
        }
    }
}

#[get("/report")]
async fn report(data: web::Data<HttpState>) -> impl Responder {
    match data.use_case.report().await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!(error = %e, "Failed to generate report");
            plain_text(HttpResponse::InternalServerError(), "Error generating report")
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(upload)
        .service(list_users)
        .service(report);
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
