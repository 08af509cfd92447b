use std::sync::Arc;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters,
    model::*, tool, tool_handler, tool_router,
    transport::stdio, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod apis;
mod cite;
mod config;
mod enrich;
mod format;
mod normalize;
mod references;
mod search;
mod session;

use cite::CitationService;
use config::Config;
use session::{drive, ResultsState, SearchKind, Session, Submission};

// ── Parameter structs ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchBooksParams {
    #[schemars(description = "Book title to search the catalog for")]
    title: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct LookupDoiParams {
    #[schemars(description = "DOI, either bare (10.xxxx/yyy) or as a https://doi.org/ URL")]
    doi: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CiteTopicParams {
    #[schemars(description = "Research topic to get suggested citations for")]
    topic: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SaveReferenceParams {
    #[schemars(description = "Exact citation text to add to the reference list")]
    text: String,
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CitationServer {
    tool_router: ToolRouter<Self>,
    config: Arc<Config>,
    service: Arc<CitationService>,
    session: Arc<Mutex<Session>>,
}

#[tool_router]
impl CitationServer {
    pub fn create() -> anyhow::Result<Self> {
        let config = Config::from_env();
        let service = config.build_service()?;

        tracing::info!(
            "Configured book search at {}, CrossRef at {}, topic service at {}",
            config.openlibrary_url,
            config.crossref_url,
            config.topic_url
        );

        Ok(Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
            service: Arc::new(service),
            session: Arc::new(Mutex::new(Session::new())),
        })
    }

    #[tool(description = "List the upstream citation services and their configuration")]
    async fn list_services(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.config.service_status())
    }

    #[tool(description = "Search a book catalog by title and return up to 5 APA citations")]
    async fn search_books(
        &self,
        Parameters(params): Parameters<SearchBooksParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = drive(&self.session, SearchKind::Books, &params.title, |title| {
            self.service.search_books(title)
        })
        .await;
        match outcome {
            Submission::Blank => text_result("Enter a book title to search."),
            Submission::Settled(ResultsState::Populated(citations)) if citations.is_empty() => {
                text_result(&format!("No books found for: {}", params.title))
            }
            other => outcome_result(other),
        }
    }

    #[tool(description = "Resolve a DOI and return its APA citation")]
    async fn lookup_doi(
        &self,
        Parameters(params): Parameters<LookupDoiParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = drive(&self.session, SearchKind::Doi, &params.doi, |doi| {
            self.service.lookup_doi(doi)
        })
        .await;
        match outcome {
            Submission::Blank => text_result("Enter a DOI to look up."),
            other => outcome_result(other),
        }
    }

    #[tool(description = "Ask the AI service for citations on a topic, each enriched with a DOI link when one can be found")]
    async fn cite_topic(
        &self,
        Parameters(params): Parameters<CiteTopicParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = drive(&self.session, SearchKind::Topic, &params.topic, |topic| {
            self.service.cite_topic(topic)
        })
        .await;
        match outcome {
            Submission::Blank => text_result("Enter a topic to generate citations for."),
            other => outcome_result(other),
        }
    }

    #[tool(description = "Show the currently displayed citation results")]
    async fn current_results(&self) -> Result<CallToolResult, McpError> {
        let session = self.session.lock().await;
        match session.current() {
            Some((kind, state)) => json_result(&serde_json::json!({ "kind": kind, "results": state })),
            None => text_result("No search has been run yet."),
        }
    }

    #[tool(description = "Save a citation to the reference list. Saving the same text twice has no effect.")]
    async fn save_reference(
        &self,
        Parameters(params): Parameters<SaveReferenceParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.text.trim().is_empty() {
            return Err(McpError::invalid_params("Citation text is empty".to_string(), None));
        }
        let mut session = self.session.lock().await;
        let added = session.references_mut().save(params.text);
        let count = session.references().len();
        let msg = if added {
            format!("Saved. The reference list has {} entries.", count)
        } else {
            format!("Already saved. The reference list has {} entries.", count)
        };
        text_result(&msg)
    }

    #[tool(description = "List saved references in alphabetical order")]
    async fn list_references(&self) -> Result<CallToolResult, McpError> {
        let session = self.session.lock().await;
        json_result(&session.references().list())
    }

    #[tool(description = "Remove every saved reference")]
    async fn clear_references(&self) -> Result<CallToolResult, McpError> {
        let mut session = self.session.lock().await;
        if session.references().is_empty() {
            return text_result("The reference list is already empty.");
        }
        let removed = session.references().len();
        session.references_mut().clear();
        tracing::info!("Cleared {} saved references", removed);
        text_result(&format!("Cleared {} references.", removed))
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn text_result(msg: &str) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(msg.to_string())]))
}

fn outcome_result(outcome: Submission) -> Result<CallToolResult, McpError> {
    match outcome {
        Submission::Settled(ResultsState::Populated(citations)) => json_result(&citations),
        Submission::Settled(ResultsState::Failed(msg)) => Ok(CallToolResult::error(vec![Content::text(msg)])),
        Submission::Blank => text_result("Nothing to search for."),
        Submission::Settled(ResultsState::Idle | ResultsState::Loading) | Submission::Superseded => {
            text_result("A newer search replaced this one before it finished.")
        }
    }
}

#[tool_handler]
impl ServerHandler for CitationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Build APA citations by searching a book catalog, resolving a DOI, \
                 or asking for AI-suggested citations on a topic, then keep the ones \
                 you want in a session reference list. Topic citations are assembled \
                 from the AI's fields and are not APA-validated."
                    .into(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting apa-citer MCP server");

    let server = CitationServer::create()?;
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
