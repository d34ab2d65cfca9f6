//! # API REST
//!
//! HTTP front end for the EPR service.
//!
//! Handlers translate between the JSON bodies in `api_shared::dto` and the services in
//! `epr_core`. Every route except `/health`, `/oauth/token` and the OpenAPI document requires
//! a bearer token, enforced by the [`AuthUser`](extract::AuthUser) extractor.

pub mod error;
pub mod extract;

use api_shared::auth::TOKEN_TYPE;
use api_shared::dto::{
    ErrorRes, ExportJobRes, ExportQuery, HealthRes, MedicationCreateReq, MedicationRes,
    ObservationCreateReq, ObservationRes, PatientCreateReq, PatientIdQuery, PatientRes,
    PatientSearchQuery, SimulateQuery, SimulateRes, TokenReq, TokenRes,
};
use api_shared::{HealthService, Role, TokenService, UserInfo};
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        Path as AxumPath, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use epr_core::{Demographics, NonEmptyText, PatientError, Services, ShardableUuid};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use error::{ApiError, ApiResult};
use extract::AuthUser;

/// Default number of events generated by `/simulate/events`.
pub const DEFAULT_SIMULATED_EVENTS: u32 = 10;

/// Shared state for every request handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub services: Services,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(services: Services, tokens: TokenService) -> Self {
        Self {
            services,
            tokens: Arc::new(tokens),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mock EPR",
        description = "Mock electronic patient record with pseudonymised patients"
    ),
    paths(
        health,
        login,
        userinfo,
        search_patient,
        create_patient,
        list_observations,
        create_observation,
        list_medications,
        create_medication,
        create_export,
        download_export,
        simulate_events,
    ),
    components(schemas(
        HealthRes,
        TokenReq,
        TokenRes,
        UserInfo,
        Role,
        PatientCreateReq,
        PatientRes,
        ObservationCreateReq,
        ObservationRes,
        MedicationCreateReq,
        MedicationRes,
        ExportJobRes,
        SimulateRes,
        ErrorRes,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Builds the application router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/oauth/token", post(login))
        .route("/oauth/userinfo", get(userinfo))
        .route("/Patient", get(search_patient).post(create_patient))
        .route("/Observation", get(list_observations).post(create_observation))
        .route("/MedicationRequest", get(list_medications).post(create_medication))
        .route("/export/csv", post(create_export))
        .route("/export/csv/:job_id", get(download_export))
        .route("/simulate/events", post(simulate_events))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the application until the server fails.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops with an I/O error.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Starting EPR REST API on {}", addr);
    axum::serve(listener, router(state)).await
}

/// Parses a patient id from a request. Malformed ids cannot name a patient, so they are
/// reported as not found.
fn patient_id(raw: &str) -> ApiResult<ShardableUuid> {
    ShardableUuid::parse(raw.trim()).map_err(|_| ApiError::patient_not_found())
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Service is up", body = HealthRes)
    )
)]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/oauth/token",
    tag = "Authentication",
    request_body(content = TokenReq, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Bearer token issued", body = TokenRes),
        (status = 401, description = "Incorrect username or password", body = ErrorRes)
    )
)]
async fn login(
    State(state): State<AppState>,
    form: Result<Form<TokenReq>, FormRejection>,
) -> ApiResult<Json<TokenRes>> {
    let Form(req) = form?;
    let issued = state.tokens.login(&req.username, &req.password)?;
    tracing::info!(username = %req.username, "token issued");
    Ok(Json(TokenRes {
        access_token: issued.access_token,
        token_type: TOKEN_TYPE.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/oauth/userinfo",
    tag = "Authentication",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The authenticated user", body = UserInfo),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
async fn userinfo(AuthUser(user): AuthUser) -> Json<UserInfo> {
    Json(user)
}

#[utoipa::path(
    get,
    path = "/Patient",
    tag = "Patient",
    security(("bearer" = [])),
    params(PatientSearchQuery),
    responses(
        (status = 200, description = "Matching patient", body = PatientRes),
        (status = 400, description = "Identifier missing or malformed", body = ErrorRes),
        (status = 404, description = "No patient with this identifier", body = ErrorRes)
    )
)]
async fn search_patient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<PatientSearchQuery>, QueryRejection>,
) -> ApiResult<Json<PatientRes>> {
    let Query(query) = query?;
    let identifier = query
        .identifier
        .ok_or_else(|| ApiError::BadRequest("identifier query parameter is required".into()))?;

    tracing::info!(username = %user.username, "patient search");
    let patient = state
        .services
        .patients
        .find_patient_by_identifier(&identifier)?
        .ok_or_else(ApiError::patient_not_found)?;

    tracing::info!(pseudonym = %patient.pseudonym, "patient found");
    Ok(Json(PatientRes::from(&patient)))
}

#[utoipa::path(
    post,
    path = "/Patient",
    tag = "Patient",
    security(("bearer" = [])),
    request_body = PatientCreateReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 400, description = "Malformed identifier or demographics", body = ErrorRes),
        (status = 409, description = "Identifier already registered", body = ErrorRes)
    )
)]
async fn create_patient(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<PatientCreateReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PatientRes>)> {
    let Json(req) = body?;
    let demographics = Demographics {
        sex: req.sex.parse()?,
        age_band: NonEmptyText::new(&req.age_band).map_err(PatientError::from)?,
    };

    tracing::info!(username = %user.username, "creating patient");
    let patient = state
        .services
        .patients
        .create_patient(&req.nhs_number, demographics)?;

    Ok((StatusCode::CREATED, Json(PatientRes::from(&patient))))
}

#[utoipa::path(
    get,
    path = "/Observation",
    tag = "Observation",
    security(("bearer" = [])),
    params(PatientIdQuery),
    responses(
        (status = 200, description = "Observations, newest first", body = [ObservationRes]),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
async fn list_observations(
    State(state): State<AppState>,
    _user: AuthUser,
    query: Result<Query<PatientIdQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ObservationRes>>> {
    let Query(query) = query?;
    let id = patient_id(&query.patient)?;
    let observations = state.services.clinical.observations(&id)?;
    tracing::info!("retrieved {} observations", observations.len());
    Ok(Json(observations.iter().map(ObservationRes::from).collect()))
}

#[utoipa::path(
    post,
    path = "/Observation",
    tag = "Observation",
    security(("bearer" = [])),
    request_body = ObservationCreateReq,
    responses(
        (status = 201, description = "Observation recorded", body = ObservationRes),
        (status = 400, description = "Invalid observation", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
async fn create_observation(
    State(state): State<AppState>,
    _user: AuthUser,
    body: Result<Json<ObservationCreateReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ObservationRes>)> {
    let Json(req) = body?;
    let id = patient_id(&req.patient_id)?;
    let observation = state.services.clinical.add_observation(req.into_new(id)?)?;
    Ok((StatusCode::CREATED, Json(ObservationRes::from(&observation))))
}

#[utoipa::path(
    get,
    path = "/MedicationRequest",
    tag = "Medication",
    security(("bearer" = [])),
    params(PatientIdQuery),
    responses(
        (status = 200, description = "Medications, newest start first", body = [MedicationRes]),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
async fn list_medications(
    State(state): State<AppState>,
    _user: AuthUser,
    query: Result<Query<PatientIdQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MedicationRes>>> {
    let Query(query) = query?;
    let id = patient_id(&query.patient)?;
    let medications = state.services.clinical.medications(&id)?;
    tracing::info!("retrieved {} medications", medications.len());
    Ok(Json(medications.iter().map(MedicationRes::from).collect()))
}

#[utoipa::path(
    post,
    path = "/MedicationRequest",
    tag = "Medication",
    security(("bearer" = [])),
    request_body = MedicationCreateReq,
    responses(
        (status = 201, description = "Medication recorded", body = MedicationRes),
        (status = 400, description = "Invalid medication", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
async fn create_medication(
    State(state): State<AppState>,
    _user: AuthUser,
    body: Result<Json<MedicationCreateReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MedicationRes>)> {
    let Json(req) = body?;
    let id = patient_id(&req.patient_id)?;
    let medication = state.services.clinical.add_medication(req.into_new(id)?)?;
    Ok((StatusCode::CREATED, Json(MedicationRes::from(&medication))))
}

#[utoipa::path(
    post,
    path = "/export/csv",
    tag = "Export",
    security(("bearer" = [])),
    params(ExportQuery),
    responses(
        (status = 200, description = "Export job finished", body = ExportJobRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 500, description = "Export failed", body = ErrorRes)
    )
)]
async fn create_export(
    State(state): State<AppState>,
    _user: AuthUser,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> ApiResult<Json<ExportJobRes>> {
    let Query(query) = query?;
    let scope = query
        .patient_id
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(patient_id)
        .transpose()?;

    let job = state
        .services
        .exports
        .create_export(scope.as_ref())
        .map_err(|err| match err {
            PatientError::PatientNotFound(_) => ApiError::patient_not_found(),
            other => {
                tracing::error!("export failed: {other}");
                ApiError::Internal("Export failed".into())
            }
        })?;

    Ok(Json(ExportJobRes::from(&job)))
}

#[utoipa::path(
    get,
    path = "/export/csv/{job_id}",
    tag = "Export",
    security(("bearer" = [])),
    params(("job_id" = String, Path, description = "Export job id")),
    responses(
        (status = 200, description = "ZIP archive", content_type = "application/zip", body = Vec<u8>),
        (status = 400, description = "Export job is not complete", body = ErrorRes),
        (status = 404, description = "Job or archive not found", body = ErrorRes)
    )
)]
async fn download_export(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AxumPath(job_id): AxumPath<String>,
) -> ApiResult<Response> {
    let job_id = ShardableUuid::parse(job_id.trim()).map_err(|_| ApiError::export_job_not_found())?;
    let (job, path) = state.services.exports.export_archive(&job_id)?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("Export file not found".into()));
        }
        Err(e) => return Err(PatientError::FileRead(e).into()),
    };

    tracing::info!(username = %user.username, job = %job.id, "export downloaded");
    let disposition = format!("attachment; filename=\"{}\"", job.download_name());
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/simulate/events",
    tag = "Simulator",
    security(("bearer" = [])),
    params(SimulateQuery),
    responses(
        (status = 200, description = "Events generated", body = SimulateRes),
        (status = 400, description = "Count out of range", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
async fn simulate_events(
    State(state): State<AppState>,
    _user: AuthUser,
    query: Result<Query<SimulateQuery>, QueryRejection>,
) -> ApiResult<Json<SimulateRes>> {
    let Query(query) = query?;
    let id = patient_id(&query.patient_id)?;
    let count = query.count.unwrap_or(DEFAULT_SIMULATED_EVENTS);

    let patient = state.services.patients.get_patient(&id)?;
    let created = state.services.simulator.simulate(&id, count)?;
    tracing::info!(pseudonym = %patient.pseudonym, "simulated {} events", created.len());

    Ok(Json(SimulateRes {
        message: format!("Created {} observations", created.len()),
        patient_pseudonym: patient.pseudonym.to_string(),
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
