use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use fest_registry::config::AppConfig;
use fest_registry::error::AppError;
use fest_registry::fest::domain::{
    AcademicYear, EventCategory, EventId, EventMode, EventResult, FestEvent, NewRegistration,
    Placement, Registration, RegistrationId, RegistrationStatus, Student, StudentId, UserId,
};
use fest_registry::fest::memory::{InMemoryFestStore, InMemoryIdentity};
use fest_registry::fest::registrations::{registry_router, RegistrationService};
use fest_registry::fest::report::{FestAnalytics, Standings};
use fest_registry::fest::roles::{Actor, FestRole, RoleSet, UserProfile};
use fest_registry::fest::settings::{FestSettings, InMemorySettings};
use fest_registry::fest::store::{FestStore, IdentityProvider, StoreError};
use fest_registry::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Festival Registration Engine",
    about = "Run and demonstrate the festival registration engine from the command line",
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
    /// Render reports over the bundled sample festival
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Walk a scripted registration lifecycle against the sample festival
    Demo,
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

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Event occupancy and engagement analytics
    Analytics(AnalyticsArgs),
    /// Year standings folded from recorded results
    Standings,
}

#[derive(Args, Debug)]
struct AnalyticsArgs {
    /// Number of events to list in the most-registered ranking
    #[arg(long, default_value_t = 5)]
    top: usize,
}

/// In-memory backends seeded with the sample festival.
struct SampleRegistry {
    store: Arc<InMemoryFestStore>,
    settings: Arc<InMemorySettings>,
    identity: Arc<InMemoryIdentity>,
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
        Command::Report { command } => run_report(command),
        Command::Demo => run_demo(),
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

    let registry = sample_registry()?;
    let students = registry.store.students()?.len();
    let events = registry.store.events()?.len();
    info!(students, events, "seeded sample festival data");

    let service = Arc::new(RegistrationService::new(
        Arc::clone(&registry.store),
        Arc::clone(&registry.settings),
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(registry_router(service, registry.identity))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "festival registration engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_report(command: ReportCommand) -> Result<(), AppError> {
    let registry = sample_registry()?;
    let service = RegistrationService::new(
        Arc::clone(&registry.store),
        Arc::clone(&registry.settings),
    );
    let admin = fixture_actor(&registry.identity, "user-admin")?;

    match command {
        ReportCommand::Analytics(args) => {
            let report = service.event_analytics(&admin, args.top)?;
            render_analytics(&report);
        }
        ReportCommand::Standings => {
            let standings = service.standings(&admin)?;
            render_standings(&standings);
        }
    }

    Ok(())
}

fn run_demo() -> Result<(), AppError> {
    let registry = sample_registry()?;
    let service = RegistrationService::new(
        Arc::clone(&registry.store),
        Arc::clone(&registry.settings),
    );

    let admin = fixture_actor(&registry.identity, "user-admin")?;
    let coordinator = fixture_actor(&registry.identity, "user-coord-first")?;
    let ananya = fixture_actor(&registry.identity, "user-ananya")?;

    println!("Festival registration demo");
    println!(
        "Roster: {} students, {} open events",
        registry.store.students()?.len(),
        service.events()?.len()
    );

    println!("\nRegistration lifecycle");
    let group_dance = service.create(
        &ananya,
        NewRegistration {
            student_id: StudentId("stu-101".into()),
            event_id: EventId("evt-group-dance".into()),
        },
    )?;
    println!(
        "- Ananya entered Group Dance ({}, {})",
        group_dance.id, group_dance.status
    );

    match service.create(
        &ananya,
        NewRegistration {
            student_id: StudentId("stu-101".into()),
            event_id: EventId("evt-solo-vocals".into()),
        },
    ) {
        Ok(registration) => println!("- unexpected duplicate entry {}", registration.id),
        Err(err) => println!("- duplicate Solo Vocals entry refused: {err}"),
    }

    match service.create(
        &ananya,
        NewRegistration {
            student_id: StudentId("stu-101".into()),
            event_id: EventId("evt-photo-walk".into()),
        },
    ) {
        Ok(registration) => println!("- unexpected late entry {}", registration.id),
        Err(err) => println!("- Photography Walk entry refused: {err}"),
    }

    match service.create(
        &ananya,
        NewRegistration {
            student_id: StudentId("stu-101".into()),
            event_id: EventId("evt-fashion-show".into()),
        },
    ) {
        Ok(registration) => println!("- unexpected quota-busting entry {}", registration.id),
        Err(err) => println!("- Fashion Show entry refused: {err}"),
    }

    let probe = service.can_register(&StudentId("stu-101".into()), EventCategory::OnStage)?;
    println!(
        "- Ananya's on-stage quota: {}/{} used, another entry allowed: {}",
        probe.current_count, probe.limit, probe.allowed
    );

    println!("\nReview queue");
    let approved =
        service.set_status(&coordinator, &group_dance.id, RegistrationStatus::Approved)?;
    println!(
        "- first-year coordinator approved {} ({})",
        approved.id, approved.status
    );

    match service.set_status(
        &coordinator,
        &RegistrationId("reg-seed-3".into()),
        RegistrationStatus::Approved,
    ) {
        Ok(registration) => println!("- unexpected cross-year approval {}", registration.id),
        Err(err) => println!("- third-year entry out of reach: {err}"),
    }

    let assisted = service.create(
        &admin,
        NewRegistration {
            student_id: StudentId("stu-102".into()),
            event_id: EventId("evt-solo-vocals".into()),
        },
    )?;
    println!(
        "- admin entered Vikram into Solo Vocals on his behalf (assisted: {})",
        assisted.registered_by.is_some()
    );

    println!("\nAudit trail");
    for entry in registry.store.activity() {
        let actor = entry
            .actor
            .as_ref()
            .map(|user| user.0.as_str())
            .unwrap_or("system");
        println!("- {} by {}: {}", entry.action.tag(), actor, entry.details);
    }

    println!();
    let standings = service.standings(&admin)?;
    render_standings(&standings);

    Ok(())
}

/// Resolves a seeded directory user into an acting session.
fn fixture_actor(identity: &InMemoryIdentity, user_id: &str) -> Result<Actor, AppError> {
    let profile = identity
        .profile(&UserId(user_id.to_string()))?
        .ok_or(StoreError::NotFound)?;
    Actor::resolve(&profile, None).ok_or(AppError::Store(StoreError::NotFound))
}

fn render_analytics(report: &FestAnalytics) {
    println!("Event occupancy");
    for event in &report.events {
        let cap_note = match event.capacity_pct {
            Some(pct) => format!(", {pct:.0}% of cap"),
            None => String::new(),
        };
        println!(
            "- {} [{}]: {} active, {} rejected{} ({})",
            event.name,
            event.category.label(),
            event.total_active,
            event.rejected,
            cap_note,
            event.capacity.label()
        );
        if !event.missing_years.is_empty() {
            let missing: Vec<&str> = event
                .missing_years
                .iter()
                .map(|year| year.label())
                .collect();
            println!("    no entries yet from: {}", missing.join(", "));
        }
    }

    println!("\nMost registered");
    for tally in &report.top_events {
        println!("- {}: {} active entries", tally.name, tally.active);
    }

    if report.low_turnout.is_empty() {
        println!("\nLow turnout: none");
    } else {
        println!("\nLow turnout");
        for tally in &report.low_turnout {
            println!("- {}: {} active entries", tally.name, tally.active);
        }
    }

    if report.at_limit_students.is_empty() {
        println!("\nStudents at quota: none");
    } else {
        println!("\nStudents at quota");
        for student in &report.at_limit_students {
            println!(
                "- {} ({}): {} on-stage, {} off-stage",
                student.name,
                student.year.label(),
                student.on_stage,
                student.off_stage
            );
        }
    }

    println!(
        "\nTotals: {} active, {} rejected ({:.1}% rejection rate)",
        report.total_active, report.total_rejected, report.rejection_pct
    );
}

fn render_standings(standings: &Standings) {
    println!("Year standings");
    for row in &standings.table {
        println!(
            "- {}: {} pts ({} played, podiums {}/{}/{}, {} penalties)",
            row.year_label,
            row.total_points,
            row.played,
            row.first_places,
            row.second_places,
            row.third_places,
            row.penalties
        );
    }
    if standings.unlinked_results > 0 {
        println!(
            "Results without a roster year: {}",
            standings.unlinked_results
        );
    }
}

/// Seeds the in-memory backends with a small festival: a roster across all
/// four years, on- and off-stage events, directory profiles, and enough
/// registrations and results to make the reports non-trivial.
fn sample_registry() -> Result<SampleRegistry, AppError> {
    let store = Arc::new(InMemoryFestStore::new());
    let identity = Arc::new(InMemoryIdentity::new());
    let settings = Arc::new(InMemorySettings::new(FestSettings {
        max_on_stage_registrations: 2,
        max_off_stage_registrations: 3,
        registration_open: true,
        scoreboard_visible: true,
        auto_approve_registrations: false,
    }));

    let students = [
        (
            "stu-101",
            "Ananya Iyer",
            "24CS012",
            "CSE",
            AcademicYear::First,
            "ananya.iyer@campus.edu",
            Some("user-ananya"),
        ),
        (
            "stu-102",
            "Vikram Rao",
            "24EC034",
            "ECE",
            AcademicYear::First,
            "vikram.rao@campus.edu",
            None,
        ),
        (
            "stu-201",
            "Meera Pillai",
            "23ME021",
            "ME",
            AcademicYear::Second,
            "meera.pillai@campus.edu",
            Some("user-meera"),
        ),
        (
            "stu-301",
            "Arjun Menon",
            "22CE008",
            "CE",
            AcademicYear::Third,
            "arjun.menon@campus.edu",
            None,
        ),
        (
            "stu-302",
            "Sara Thomas",
            "22CS047",
            "CSE",
            AcademicYear::Third,
            "sara.thomas@campus.edu",
            None,
        ),
        (
            "stu-401",
            "Rahul Nair",
            "21EE015",
            "EE",
            AcademicYear::Fourth,
            "rahul.nair@campus.edu",
            None,
        ),
    ];
    for (id, name, roll, department, year, contact, user) in students {
        store.add_student(Student {
            id: StudentId(id.into()),
            name: name.into(),
            roll_number: roll.into(),
            department: department.into(),
            year,
            contact: contact.into(),
            user_id: user.map(|value| UserId(value.into())),
        });
    }

    let next_week = Utc::now() + Duration::days(7);
    let yesterday = Utc::now() - Duration::days(1);
    let events = [
        FestEvent {
            id: EventId("evt-solo-vocals".into()),
            name: "Solo Vocals".into(),
            category: EventCategory::OnStage,
            mode: EventMode::Solo,
            max_entries_per_year: Some(2),
            participant_cap: Some(8),
            registration_deadline: Some(next_week),
            is_active: true,
        },
        FestEvent {
            id: EventId("evt-group-dance".into()),
            name: "Group Dance".into(),
            category: EventCategory::OnStage,
            mode: EventMode::Group,
            max_entries_per_year: None,
            participant_cap: Some(40),
            registration_deadline: Some(next_week),
            is_active: true,
        },
        FestEvent {
            id: EventId("evt-fashion-show".into()),
            name: "Fashion Show".into(),
            category: EventCategory::OnStage,
            mode: EventMode::Team,
            max_entries_per_year: None,
            participant_cap: Some(16),
            registration_deadline: None,
            is_active: true,
        },
        FestEvent {
            id: EventId("evt-code-golf".into()),
            name: "Code Golf".into(),
            category: EventCategory::OffStage,
            mode: EventMode::Solo,
            max_entries_per_year: None,
            participant_cap: Some(24),
            registration_deadline: Some(next_week),
            is_active: true,
        },
        FestEvent {
            id: EventId("evt-photo-walk".into()),
            name: "Photography Walk".into(),
            category: EventCategory::OffStage,
            mode: EventMode::Solo,
            max_entries_per_year: None,
            participant_cap: None,
            registration_deadline: Some(yesterday),
            is_active: true,
        },
        FestEvent {
            id: EventId("evt-street-play".into()),
            name: "Street Play".into(),
            category: EventCategory::OnStage,
            mode: EventMode::Team,
            max_entries_per_year: None,
            participant_cap: Some(30),
            registration_deadline: None,
            is_active: false,
        },
    ];
    for event in events {
        store.add_event(event);
    }

    let seeded = [
        (
            "reg-seed-1",
            "stu-101",
            "evt-solo-vocals",
            RegistrationStatus::Approved,
            None,
        ),
        (
            "reg-seed-2",
            "stu-201",
            "evt-solo-vocals",
            RegistrationStatus::Approved,
            None,
        ),
        (
            "reg-seed-3",
            "stu-301",
            "evt-solo-vocals",
            RegistrationStatus::Pending,
            Some("user-coord-first"),
        ),
        (
            "reg-seed-4",
            "stu-302",
            "evt-code-golf",
            RegistrationStatus::Approved,
            None,
        ),
        (
            "reg-seed-5",
            "stu-401",
            "evt-code-golf",
            RegistrationStatus::Rejected,
            None,
        ),
        (
            "reg-seed-6",
            "stu-101",
            "evt-code-golf",
            RegistrationStatus::Approved,
            None,
        ),
    ];
    for (id, student, event, status, staff) in seeded {
        store.insert_registration(Registration {
            id: RegistrationId(id.into()),
            student_id: StudentId(student.into()),
            event_id: EventId(event.into()),
            status,
            registered_at: Utc::now(),
            registered_by: staff.map(|value| UserId(value.into())),
        })?;
    }

    let results = [
        ("reg-seed-1", 10, Placement::First),
        ("reg-seed-2", 7, Placement::Second),
        ("reg-seed-4", 10, Placement::First),
        ("reg-seed-6", -2, Placement::Unplaced),
    ];
    for (registration, points, position) in results {
        store.record_result(EventResult {
            registration_id: RegistrationId(registration.into()),
            points,
            position,
            recorded_at: Utc::now(),
        })?;
    }

    let profiles = [
        (
            "user-admin",
            "Festival Admin",
            "admin@campus.edu",
            vec![FestRole::Admin],
            None,
        ),
        (
            "user-em",
            "Events Desk",
            "events@campus.edu",
            vec![FestRole::EventManager],
            None,
        ),
        (
            "user-coord-first",
            "First Year Coordinator",
            "coord.first@campus.edu",
            vec![FestRole::FirstYearCoordinator],
            None,
        ),
        (
            "user-ananya",
            "Ananya Iyer",
            "ananya.iyer@campus.edu",
            vec![FestRole::Student],
            Some("stu-101"),
        ),
        (
            "user-meera",
            "Meera Pillai",
            "meera.pillai@campus.edu",
            vec![FestRole::Student],
            Some("stu-201"),
        ),
    ];
    for (id, name, email, roles, student) in profiles {
        identity.add_profile(UserProfile {
            user_id: UserId(id.into()),
            display_name: name.into(),
            email: email.into(),
            roles: roles.into_iter().collect::<RoleSet>(),
            linked_student_id: student.map(|value| StudentId(value.into())),
        });
    }

    Ok(SampleRegistry {
        store,
        settings,
        identity,
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
