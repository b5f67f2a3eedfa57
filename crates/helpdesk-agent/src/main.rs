use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use helpdesk_agent::service::{self, AppState};
use helpdesk_agent::{
    http_client, AgentConfig, HttpEmbedder, KnowledgeClient, QdrantIndex, ServiceNowClient,
    TicketingDisabled,
};
use triage::{
    ConversationHub, EscalationStateMachine, FuzzyCatalogResolver, SemanticMatcher, TicketDesk,
    Ticketing,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AgentConfig::default();
    info!(
        embedding = %config.embedding.url,
        qdrant = %config.qdrant.url,
        collection = %config.qdrant.collection,
        "Helpdesk agent starting"
    );

    let triage_config = config.load_triage_config()?;
    let client = http_client(config.http_timeout).context("Failed to build HTTP client")?;

    let matcher = SemanticMatcher::new(
        Arc::new(HttpEmbedder::new(
            config.embedding.clone(),
            client.clone(),
            config.http_timeout,
        )),
        Arc::new(QdrantIndex::new(
            config.qdrant.clone(),
            client.clone(),
            config.http_timeout,
        )),
        triage_config.matcher.clone(),
    );

    let servicenow = config.servicenow.clone().map(|endpoint| {
        Arc::new(ServiceNowClient::new(endpoint, client.clone(), config.http_timeout))
    });
    let ticketing: Arc<dyn Ticketing> = match &servicenow {
        Some(sn) => sn.clone() as Arc<dyn Ticketing>,
        None => {
            warn!("SERVICENOW_INSTANCE/USERNAME/PASSWORD not set; escalations will fail");
            Arc::new(TicketingDisabled)
        }
    };
    let remedies = Arc::new(KnowledgeClient::new(
        config.knowledge.clone(),
        client.clone(),
        config.http_timeout,
    ));

    let desk_timeout = triage_config.ticketing.timeout();
    let resolver_config = triage_config.resolver.clone();
    let mut machine =
        EscalationStateMachine::new(triage_config, matcher.clone(), ticketing, remedies.clone())
            .with_knowledge(remedies);

    match config.load_catalog()? {
        Some(catalog) => {
            info!(entries = catalog.entries().len(), "Software catalog loaded");
            let resolver = FuzzyCatalogResolver::new(Arc::new(catalog), resolver_config);
            machine = machine.with_resolver(resolver);
        }
        None => info!("SOFTWARE_CATALOG_PATH not set; software requests disabled"),
    }
    if let Some(sn) = servicenow {
        machine = machine.with_desk(TicketDesk::new(sn, desk_timeout));
    }

    let state = AppState {
        matcher,
        hub: Arc::new(ConversationHub::new(machine)),
    };
    let app = service::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
