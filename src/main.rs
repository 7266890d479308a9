use std::sync::Arc;

use tower_http::cors::CorsLayer;

use clinic_intake::config::IntakeConfig;
use clinic_intake::narration::{DisabledNarrator, NarrationConfig, Narrator, create_narrator};
use clinic_intake::notify::{EmailNotifier, Notifier, TelegramNotifier, TwilioNotifier};
use clinic_intake::rules::RuleTable;
use clinic_intake::session::registry::spawn_sweep_task;
use clinic_intake::session::routes::{ApiState, intake_routes};
use clinic_intake::session::{IntakeManager, SessionRegistry};
use clinic_intake::sink::RecordSink;
use clinic_intake::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing; INTAKE_LOG_DIR switches output to a daily file
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let _log_guard = match std::env::var("INTAKE_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, "intake.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .init();
            None
        }
    };

    let config = IntakeConfig::from_env();

    eprintln!("🏥 Clinic Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}/api/intake/sessions", config.bind_addr);
    eprintln!("   Records: http://{}/api/records", config.bind_addr);

    // ── Rule table ───────────────────────────────────────────────────────
    // The one startup-fatal condition: without valid rules there is no form.
    let rules = Arc::new(RuleTable::load(&config.rules_path).unwrap_or_else(|e| {
        eprintln!(
            "Error: Failed to load symptom rules from {}: {}",
            config.rules_path, e
        );
        std::process::exit(1);
    }));
    eprintln!(
        "   Rules: {} symptoms from {}",
        rules.len(),
        config.rules_path
    );

    // ── Database ─────────────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(db_path).await.unwrap_or_else(
        |e| {
            eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
            std::process::exit(1);
        },
    ));
    eprintln!("   Database: {}", config.db_path);

    // ── Narration ────────────────────────────────────────────────────────
    let narrator: Arc<dyn Narrator> = match NarrationConfig::from_env() {
        Some(narration_config) => {
            eprintln!(
                "   Narration: {:?} ({})",
                narration_config.backend, narration_config.model
            );
            create_narrator(&narration_config)
        }
        None => {
            eprintln!("   Narration: disabled (fixed wording)");
            Arc::new(DisabledNarrator)
        }
    };

    // ── Notification channels ────────────────────────────────────────────
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(telegram) = TelegramNotifier::from_env() {
        eprintln!("   Telegram: enabled");
        notifiers.push(Arc::new(telegram));
    }
    if let Some(twilio) = TwilioNotifier::from_env() {
        eprintln!("   Twilio: enabled");
        notifiers.push(Arc::new(twilio));
    }
    if let Some(email) = EmailNotifier::from_env() {
        eprintln!("   Email: enabled");
        notifiers.push(Arc::new(email));
    }
    if notifiers.is_empty() {
        eprintln!("   Notifications: none configured (records stored only)");
    }
    eprintln!();

    // ── Sessions + manager ───────────────────────────────────────────────
    let sink = Arc::new(RecordSink::new(Arc::clone(&db), notifiers));
    let sessions = SessionRegistry::new();
    let _sweep_handle = spawn_sweep_task(
        Arc::clone(&sessions),
        config.sweep_interval,
        config.session_idle_timeout,
        config.submitted_retention,
    );
    let manager = Arc::new(IntakeManager::new(
        rules,
        narrator,
        sink,
        sessions,
        config.narration_timeout,
    ));

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = intake_routes(ApiState { manager, db }).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
