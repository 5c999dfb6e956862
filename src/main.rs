mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use directoryd_acl::Engine as AcEngine;
use directoryd_auth::{
    AnonymousAuthenticator, AuthError, Authenticator, BindRequest, Credentials, Principal, SimpleAuthenticator,
};
use directoryd_filter::{Evaluator, Notifier, SchemaContext};
use directoryd_interceptor::{
    AciAuthorization, AdministrativePoint, Authentication, Chain, Changelog, Collective, DefaultAuthorization, Event,
    Exception, Handlers, Normalization, OperationalAttribute, Referral, Schema as SchemaStage, StoreAdapter, Subentry,
    Trigger,
};
use directoryd_matching::MatchingTable;
use directoryd_schema::Registry;
use directoryd_store::{Entry, IndexPolicy, LdifBackend, SledBackend, StoreBackend};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "directoryd", about = "Standalone LDAPv3 directory server")]
struct Cli {
    #[arg(short, long, default_value = "directoryd.toml")]
    config: PathBuf,
}

/// Dispatches a bind request to the anonymous or simple authenticator by
/// credential shape; strong (SASL) and delegating binds need a verifier or
/// upstream configured externally and are rejected here.
struct DispatchAuthenticator {
    anonymous: AnonymousAuthenticator,
    simple: SimpleAuthenticator,
}

impl Authenticator for DispatchAuthenticator {
    fn authenticate(&self, req: &BindRequest) -> directoryd_auth::Result<Principal> {
        match &req.credentials {
            Credentials::Anonymous => self.anonymous.authenticate(req),
            Credentials::Simple(_) => self.simple.authenticate(req),
            Credentials::Strong { .. } | Credentials::Delegating { .. } => Err(AuthError::InvalidCredentials),
        }
    }
}

fn open_backend(partition: &config::PartitionConfig) -> Result<Arc<dyn StoreBackend>> {
    let backend: Arc<dyn StoreBackend> = match partition.backend {
        config::BackendKind::Sled => {
            let db = sled::open(&partition.path).with_context(|| format!("opening sled store at {}", partition.path.display()))?;
            Arc::new(SledBackend::open(db, IndexPolicy::default())?)
        }
        config::BackendKind::Ldif => Arc::new(LdifBackend::open(&partition.path)?),
    };
    Ok(backend)
}

fn load_schema(registry: &Registry, schema_file: &std::path::Path) -> Result<()> {
    let text = std::fs::read_to_string(schema_file)
        .with_context(|| format!("reading schema file {}", schema_file.display()))?;
    let objects = directoryd_schema::parse_schema_file(&text).context("parsing schema description grammar")?;
    for object in objects {
        registry.register(object).context("registering schema object")?;
    }
    Ok(())
}

fn ensure_admin_entry(store: &Arc<dyn StoreBackend>, admin_dn: &directoryd_dn::Dn, password: &str) -> Result<()> {
    if store.lookup(admin_dn).is_ok() {
        return Ok(());
    }
    let mut entry = Entry::default();
    entry.attrs.insert("objectClass".into(), vec![b"organizationalRole".to_vec(), b"simpleSecurityObject".to_vec()]);
    entry.attrs.insert("userPassword".into(), vec![directoryd_auth::hash_password(password.as_bytes()).into_bytes()]);
    store.add(admin_dn, entry).context("seeding initial admin entry")?;
    Ok(())
}

/// Assembles the full interceptor chain for one partition, in the 14-stage
/// order given in spec.md §4.F. ACI authorization only engages when
/// `enable_aci` is set; otherwise the default admin/self policy governs.
/// The changelog stage is only spliced in when `enable_changelog` is set.
fn build_chain(
    config: &Config,
    store: Arc<dyn StoreBackend>,
    registry: Arc<Registry>,
    evaluator: Arc<Evaluator>,
    authenticator: Arc<dyn Authenticator>,
    notifier: Arc<Notifier>,
) -> Chain {
    let ac_engine = Arc::new(AcEngine::new(Vec::new()));
    let administrative_point = Arc::new(AdministrativePoint::new(store.clone()));
    let mut stages: Vec<(&'static str, Arc<dyn Handlers>)> = vec![
        ("normalization", Arc::new(Normalization)),
        ("authentication", Arc::new(Authentication::new(authenticator, store.clone()))),
        ("referral", Arc::new(Referral::new())),
        ("aci-authorization", Arc::new(AciAuthorization::new(ac_engine, store.clone(), evaluator.clone(), config.enable_aci))),
        ("default-authorization", Arc::new(DefaultAuthorization::new(!config.enable_aci))),
        ("administrative-point", administrative_point.clone()),
        ("exception", Arc::new(Exception::new())),
        ("schema", Arc::new(SchemaStage::new(registry))),
        ("operational-attribute", Arc::new(OperationalAttribute::new(store.clone()))),
        ("subentry", Arc::new(Subentry::new(store.clone(), administrative_point))),
        ("collective", Arc::new(Collective::new())),
        ("event", Arc::new(Event::new(store.clone(), notifier))),
        ("trigger", Arc::new(Trigger::new(Vec::new()))),
    ];
    if config.enable_changelog {
        stages.push(("changelog", Arc::new(Changelog::new(config.changelog_path.clone()))));
    }
    stages.push(("store", Arc::new(StoreAdapter::new(store, evaluator))));
    Chain::new(stages)
}

async fn run(config: Config) -> Result<()> {
    let registry = Arc::new(Registry::new(false));
    load_schema(&registry, &config.schema_file)?;

    let primary = config.partitions.first().expect("Config::load rejects an empty partition list");
    let store = open_backend(primary)?;

    let admin_dn = directoryd_dn::parse(&config.admin_dn).context("parsing admin_dn")?;
    ensure_admin_entry(&store, &admin_dn, &config.admin_password)?;

    let schema_context = Arc::new(SchemaContext::new(registry.clone(), Arc::new(MatchingTable::with_standard_rules())));
    let evaluator = Arc::new(Evaluator::new(store.clone(), schema_context));
    let notifier = Arc::new(Notifier::new());

    let authenticator: Arc<dyn Authenticator> = Arc::new(DispatchAuthenticator {
        anonymous: AnonymousAuthenticator,
        simple: SimpleAuthenticator::new(store.clone(), config.password_policy.to_policy()),
    });

    let chain = build_chain(&config, store, registry, evaluator, authenticator, notifier);
    tracing::info!(stages = ?chain.names(), "interceptor chain assembled");

    tracing::info!(bind_address = %config.bind_address, "directoryd ready (transport layer not wired into this core)");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("received interrupt, shutting down");
    Ok(())
}

/// Distinguishes the two ways `run` can end successfully: an interrupt
/// (the only shutdown path this binary currently exposes — there is no
/// administrative shutdown operation in the core) always exits 130, per
/// spec.md §6.
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start async runtime");
            std::process::exit(2);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => std::process::exit(EXIT_INTERRUPTED),
        Err(e) => {
            tracing::error!(error = %e, "fatal runtime error");
            std::process::exit(2);
        }
    }
}
