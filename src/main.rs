use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use bonus_panel::bonus::{
    load_calendar, load_roster, load_rules, normalize_key, parse_roster, BonusEngine,
    BonusRow, CityQualityThresholds, IndicatorCalendar, SourceError, SupervisorCityShares,
    QUARTER_PERIOD,
};
use bonus_panel::config::{AppConfig, DataConfig};
use bonus_panel::error::AppError;
use bonus_panel::telemetry;
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    report: ReportContext,
}

/// Everything a report computation needs: the engine over the static tables,
/// the indicator calendar, and where the roster exports live.
#[derive(Clone)]
struct ReportContext {
    engine: Arc<BonusEngine>,
    calendar: Arc<IndicatorCalendar>,
    data: DataConfig,
}

#[derive(Parser, Debug)]
#[command(
    name = "Painel de Bônus",
    about = "Compute and serve monthly and quarterly logistics bonus payouts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute a month or the quarter and print it to stdout
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Month to compute (e.g. OUTUBRO), or TRIMESTRE for the quarter view
    #[arg(long, default_value = "TRIMESTRE")]
    month: String,
    /// Override the configured data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Emit the report as JSON instead of text cards
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize)]
struct BonusReportRequest {
    month: String,
    /// Inline roster CSV for the requested month; when absent the roster is
    /// read from the data directory.
    #[serde(default)]
    roster_csv: Option<String>,
}

#[derive(Debug, Serialize)]
struct BonusReportResponse {
    period: String,
    generated_at: DateTime<Local>,
    summary: ReportSummary,
    rows: Vec<BonusRow>,
}

/// The dashboard's headline strip: total possible, received, forfeited.
#[derive(Debug, Serialize)]
struct ReportSummary {
    possible: f64,
    received: f64,
    forfeited: f64,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Report(args) => run_report(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    // Tables load before the listener binds; a bad table aborts the run
    // instead of surfacing mid-request.
    let report = load_report_context(config.data.clone())?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        report,
    };

    let app = router(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "bonus panel service ready");

    axum::serve(listener, app.layer(prometheus_layer)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/bonus/report", post(bonus_report_endpoint))
        .with_state(state)
}

fn load_report_context(data: DataConfig) -> Result<ReportContext, AppError> {
    let rules = load_rules(data.rules_path())?;
    let calendar = load_calendar(data.calendar_path())?;
    let engine = BonusEngine::new(
        rules,
        CityQualityThresholds::builtin(),
        SupervisorCityShares::builtin(),
    );

    Ok(ReportContext {
        engine: Arc::new(engine),
        calendar: Arc::new(calendar),
        data,
    })
}

fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data_dir) = args.data_dir {
        config.data.data_dir = data_dir;
    }

    let context = load_report_context(config.data)?;
    let report = build_report(&context, &args.month, None)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).expect("report serializes")
        );
    } else {
        render_report(&report);
    }

    Ok(())
}

/// Shared by the CLI and the HTTP endpoint. `TRIMESTRE` computes every
/// configured quarter month and aggregates; anything else computes the one
/// month, from the inline CSV when provided.
fn build_report(
    context: &ReportContext,
    month: &str,
    roster_csv: Option<&str>,
) -> Result<BonusReportResponse, AppError> {
    let month_key = normalize_key(month);

    let rows = if month_key == QUARTER_PERIOD {
        if roster_csv.is_some() {
            return Err(SourceError::InlineRosterUnsupported.into());
        }
        // Every source loads before the first row is computed, so a broken
        // month aborts the whole run.
        let mut months = Vec::new();
        for quarter_month in &context.data.quarter_months {
            let flags = context
                .calendar
                .month(quarter_month)
                .ok_or_else(|| SourceError::MonthNotConfigured(quarter_month.clone()))?;
            let records = load_roster(context.data.roster_path(quarter_month))?;
            months.push((quarter_month, flags, records));
        }
        let mut monthly_rows: Vec<BonusRow> = Vec::new();
        for (quarter_month, flags, records) in &months {
            monthly_rows.extend(context.engine.compute_month(records, flags, quarter_month));
        }
        context.engine.aggregate_quarter(&monthly_rows)
    } else {
        let flags = context
            .calendar
            .month(&month_key)
            .ok_or_else(|| SourceError::MonthNotConfigured(month_key.clone()))?;
        let records = match roster_csv {
            Some(csv) => parse_roster(Cursor::new(csv.as_bytes().to_vec()))?,
            None => load_roster(context.data.roster_path(&month_key))?,
        };
        context.engine.compute_month(&records, flags, &month_key)
    };

    let mut rows = rows;
    rows.sort_by(|a, b| {
        b.percent
            .partial_cmp(&a.percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.identity.name.cmp(&b.identity.name))
    });

    let summary = ReportSummary {
        possible: rows.iter().map(|row| row.target).sum(),
        received: rows.iter().map(|row| row.earned).sum(),
        forfeited: rows.iter().map(|row| row.lost).sum(),
    };

    Ok(BonusReportResponse {
        period: month_key,
        generated_at: Local::now(),
        summary,
        rows,
    })
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn bonus_report_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<BonusReportRequest>,
) -> Result<Json<BonusReportResponse>, AppError> {
    let report = build_report(
        &state.report,
        &payload.month,
        payload.roster_csv.as_deref(),
    )?;
    Ok(Json(report))
}

fn render_report(report: &BonusReportResponse) {
    println!("Painel de Bônus - {}", report.period);
    println!(
        "Total possível: R$ {:.2} | Recebido: R$ {:.2} | Deixou de ganhar: R$ {:.2}",
        report.summary.possible, report.summary.received, report.summary.forfeited
    );

    for row in &report.rows {
        println!();
        println!(
            "{} — {} — {}",
            row.identity.name, row.identity.role, row.identity.city
        );
        println!(
            "  Meta: R$ {:.2} | Recebido: R$ {:.2} | Perda: R$ {:.2} | Cumprimento: {:.1}%",
            row.target, row.earned, row.lost, row.percent
        );
        if !row.badge.is_empty() {
            println!("  Situação: {}", row.badge);
        }
        if !row.observation.is_empty() {
            println!("  Observação: {}", row.observation);
        }
        if !row.missed_indicators.is_empty() {
            println!(
                "  Indicadores não entregues: {}",
                row.missed_indicators.join(", ")
            );
        }
    }
}
