use log::{debug, info, warn};
use std::sync::Arc;

use crate::conversation::{ConversationTurn, Transcript};
use crate::errors::{LlmError, SessionError};
use crate::gateway::{
    ConnectionCredentials, ConnectionSummary, DatabaseGateway, DatabaseHandle, SchemaDescription,
};
use crate::llm::LlmClient;
use crate::prompts::{build_answer_prompt, build_sql_prompt, extract_sql};
use crate::session::session_model::{SessionOptions, SessionState, TurnOutcome};
use crate::sql_policy::{SqlPolicy, TrustGeneratedSql};

/// Conversation state and database handle for one user session.
///
/// Each browser session owns exactly one controller. Methods that advance the
/// state machine take `&mut self`, so a controller can never run two turns at
/// once; callers sharing a controller must serialize access themselves.
pub struct SessionController {
    gateway: Arc<dyn DatabaseGateway>,
    llm: Arc<dyn LlmClient>,
    sql_policy: Arc<dyn SqlPolicy>,
    options: SessionOptions,
    state: SessionState,
    handle: Option<Box<dyn DatabaseHandle>>,
    transcript: Transcript,
    cached_schema: Option<SchemaDescription>,
}

impl SessionController {
    pub fn new(
        gateway: Arc<dyn DatabaseGateway>,
        llm: Arc<dyn LlmClient>,
        options: SessionOptions,
    ) -> Self {
        Self {
            gateway,
            llm,
            sql_policy: Arc::new(TrustGeneratedSql),
            options,
            state: SessionState::Disconnected,
            handle: None,
            transcript: Transcript::new(),
            cached_schema: None,
        }
    }

    /// Use a policy other than the default pass-through for generated SQL.
    pub fn with_sql_policy(mut self, policy: Arc<dyn SqlPolicy>) -> Self {
        self.sql_policy = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn connection(&self) -> Option<ConnectionSummary> {
        self.handle.as_ref().map(|h| h.summary())
    }

    /// Open a connection and make it the session's handle.
    ///
    /// On failure a disconnected session stays disconnected and a connected
    /// one keeps its previous handle.
    pub async fn connect(
        &mut self,
        credentials: &ConnectionCredentials,
    ) -> Result<ConnectionSummary, SessionError> {
        if self.state.is_busy() {
            return Err(SessionError::Busy);
        }
        credentials.validate().map_err(SessionError::InvalidInput)?;

        info!(
            "Connecting to {} database '{}' on '{}'",
            credentials.kind, credentials.database, credentials.host
        );

        match self.gateway.connect(credentials).await {
            Ok(handle) => {
                let summary = handle.summary();
                self.handle = Some(handle);
                self.cached_schema = None;
                self.state = SessionState::Connected;
                Ok(summary)
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Answer one question: SQL generation, execution, answer generation.
    ///
    /// The question is recorded as a Human turn before anything else happens.
    /// The AI turn is only recorded when every step succeeded; otherwise the
    /// error is returned and the session is back in a stable state.
    pub async fn send_message(&mut self, text: &str) -> Result<TurnOutcome, SessionError> {
        match self.state {
            SessionState::Disconnected => return Err(SessionError::NotConnected),
            SessionState::AwaitingSql | SessionState::AwaitingAnswer => {
                return Err(SessionError::Busy)
            }
            SessionState::Connected => {}
        }

        if text.trim().is_empty() {
            return Err(SessionError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }

        let history_len = self.transcript.len();
        self.transcript.push(ConversationTurn::human(text));
        self.state = SessionState::AwaitingSql;

        match self.run_turn(text, history_len).await {
            Ok(outcome) => {
                self.transcript.push(ConversationTurn::ai(outcome.answer.clone()));
                self.state = SessionState::Connected;
                Ok(outcome)
            }
            Err(e) => {
                self.abort_turn(&e);
                Err(e)
            }
        }
    }

    async fn run_turn(
        &mut self,
        question: &str,
        history_len: usize,
    ) -> Result<TurnOutcome, SessionError> {
        let schema = self.schema().await?;

        let sql_prompt = build_sql_prompt(
            schema.as_str(),
            &self.transcript.turns()[..history_len],
            question,
        );
        debug!(
            "Requesting SQL from {} (prompt_len={})",
            self.llm.describe(),
            sql_prompt.len()
        );
        let reply = self.llm.complete(&sql_prompt).await?;
        let sql = extract_sql(&reply).ok_or(LlmError::EmptyResponse)?;

        let handle = self.handle.as_mut().ok_or(SessionError::NotConnected)?;
        self.sql_policy.review(handle.summary().kind, &sql)?;

        self.state = SessionState::AwaitingAnswer;
        let result = handle.execute(&sql).await?;
        debug!("Query returned {} row(s)", result.row_count());

        let answer_prompt = build_answer_prompt(schema.as_str(), &sql, &result.to_string());
        let answer = self.llm.complete(&answer_prompt).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(LlmError::EmptyResponse.into());
        }

        Ok(TurnOutcome {
            sql,
            result,
            answer: answer.to_string(),
        })
    }

    async fn schema(&mut self) -> Result<SchemaDescription, SessionError> {
        if let Some(schema) = &self.cached_schema {
            return Ok(schema.clone());
        }
        let handle = self.handle.as_mut().ok_or(SessionError::NotConnected)?;
        let schema = handle.describe_schema().await?;
        if self.options.cache_schema {
            self.cached_schema = Some(schema.clone());
        }
        Ok(schema)
    }

    fn abort_turn(&mut self, error: &SessionError) {
        warn!("Turn aborted ({}): {}", error.code(), error);
        if matches!(error, SessionError::ConnectionLost(_)) {
            self.handle = None;
            self.cached_schema = None;
            self.state = SessionState::Disconnected;
        } else {
            self.state = SessionState::Connected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GatewayError;
    use crate::gateway::QueryOutput;
    use crate::sql_policy::ReadOnlySql;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // --- Fake gateway ---

    #[derive(Default)]
    struct GatewayProbe {
        executed: Mutex<Vec<String>>,
        schema_fetches: AtomicUsize,
    }

    impl GatewayProbe {
        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }

        fn schema_fetches(&self) -> usize {
            self.schema_fetches.load(Ordering::SeqCst)
        }
    }

    struct FakeGateway {
        probe: Arc<GatewayProbe>,
        execute_result: Result<QueryOutput, GatewayError>,
    }

    impl FakeGateway {
        fn returning(result: Result<QueryOutput, GatewayError>) -> (Self, Arc<GatewayProbe>) {
            let probe = Arc::new(GatewayProbe::default());
            (
                Self {
                    probe: probe.clone(),
                    execute_result: result,
                },
                probe,
            )
        }
    }

    #[async_trait]
    impl DatabaseGateway for FakeGateway {
        async fn connect(
            &self,
            credentials: &ConnectionCredentials,
        ) -> Result<Box<dyn DatabaseHandle>, GatewayError> {
            if credentials.password == "wrong" {
                return Err(GatewayError::Connection(format!(
                    "Access denied for user '{}'@'{}'",
                    credentials.user, credentials.host
                )));
            }
            Ok(Box::new(FakeHandle {
                probe: self.probe.clone(),
                summary: credentials.summary(),
                execute_result: self.execute_result.clone(),
            }))
        }
    }

    struct FakeHandle {
        probe: Arc<GatewayProbe>,
        summary: ConnectionSummary,
        execute_result: Result<QueryOutput, GatewayError>,
    }

    #[async_trait]
    impl DatabaseHandle for FakeHandle {
        fn summary(&self) -> ConnectionSummary {
            self.summary.clone()
        }

        async fn describe_schema(&mut self) -> Result<SchemaDescription, GatewayError> {
            self.probe.schema_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(SchemaDescription::new(
                "CREATE TABLE orders (id INT, created_at DATETIME, total DECIMAL(10,2))",
            ))
        }

        async fn execute(&mut self, sql: &str) -> Result<QueryOutput, GatewayError> {
            self.probe.executed.lock().unwrap().push(sql.to_string());
            self.execute_result.clone()
        }
    }

    // --- Scripted LLM ---

    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn with_replies(replies: &[&str]) -> Arc<Self> {
            let llm = Self::default();
            for reply in replies {
                llm.push(Ok(reply.to_string()));
            }
            Arc::new(llm)
        }

        fn push(&self, reply: Result<String, LlmError>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Provider("no scripted reply".to_string())))
        }
    }

    // --- Helpers ---

    fn count_result(n: u32) -> QueryOutput {
        QueryOutput::Rows {
            columns: vec!["COUNT(*)".to_string()],
            rows: vec![vec![n.to_string()]],
            truncated: 0,
        }
    }

    fn shop_credentials() -> ConnectionCredentials {
        ConnectionCredentials::mysql("localhost", "root", "secret", "shop")
    }

    async fn connected_session(
        result: Result<QueryOutput, GatewayError>,
        llm: Arc<ScriptedLlm>,
        options: SessionOptions,
    ) -> (SessionController, Arc<GatewayProbe>) {
        let (gateway, probe) = FakeGateway::returning(result);
        let mut session = SessionController::new(Arc::new(gateway), llm, options);
        session.connect(&shop_credentials()).await.unwrap();
        (session, probe)
    }

    // --- Tests ---

    #[test]
    fn test_new_session_is_disconnected_and_empty() {
        let (gateway, _) = FakeGateway::returning(Ok(count_result(0)));
        let session = SessionController::new(
            Arc::new(gateway),
            ScriptedLlm::with_replies(&[]),
            SessionOptions::default(),
        );
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.transcript().is_empty());
        assert!(session.connection().is_none());
    }

    #[tokio::test]
    async fn test_connect_with_wrong_password_stays_disconnected() {
        let (gateway, _) = FakeGateway::returning(Ok(count_result(0)));
        let mut session = SessionController::new(
            Arc::new(gateway),
            ScriptedLlm::with_replies(&[]),
            SessionOptions::default(),
        );

        let creds = ConnectionCredentials::mysql("localhost", "root", "wrong", "shop");
        let err = session.connect(&creds).await.unwrap_err();

        assert!(matches!(err, SessionError::Connection(_)));
        assert!(err.to_string().contains("Access denied"));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.connection().is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_incomplete_form() {
        let (gateway, _) = FakeGateway::returning(Ok(count_result(0)));
        let mut session = SessionController::new(
            Arc::new(gateway),
            ScriptedLlm::with_replies(&[]),
            SessionOptions::default(),
        );
        let creds = ConnectionCredentials::mysql("localhost", "root", "", "");
        let err = session.connect(&creds).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_message_before_connect_is_refused() {
        let (gateway, probe) = FakeGateway::returning(Ok(count_result(0)));
        let llm = ScriptedLlm::with_replies(&["SELECT 1"]);
        let mut session =
            SessionController::new(Arc::new(gateway), llm.clone(), SessionOptions::default());

        let err = session.send_message("how many orders?").await.unwrap_err();

        assert_eq!(err, SessionError::NotConnected);
        assert!(session.transcript().is_empty());
        assert!(llm.prompts().is_empty());
        assert!(probe.executed().is_empty());
    }

    #[tokio::test]
    async fn test_successful_turn_executes_generated_sql() {
        let llm = ScriptedLlm::with_replies(&[
            "```sql\nSELECT COUNT(*) FROM orders WHERE DATE(created_at) = CURDATE()\n```",
            "There were 17 orders today.",
        ]);
        let (mut session, probe) =
            connected_session(Ok(count_result(17)), llm.clone(), SessionOptions::default()).await;

        let outcome = session.send_message("how many orders today?").await.unwrap();

        let executed = probe.executed();
        assert_eq!(executed.len(), 1);
        let sql = &executed[0];
        assert!(!sql.is_empty());
        assert!(sql.to_uppercase().contains("SELECT"));
        assert!(sql.contains("orders"));

        assert_eq!(outcome.sql, *sql);
        assert_eq!(outcome.answer, "There were 17 orders today.");
        assert_eq!(session.state(), SessionState::Connected);

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], ConversationTurn::human("how many orders today?"));
        assert_eq!(turns[1], ConversationTurn::ai("There were 17 orders today."));

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Question: how many orders today?"));
        assert!(prompts[1].contains(sql.as_str()));
        assert!(prompts[1].contains("COUNT(*)\n17"));
    }

    #[tokio::test]
    async fn test_transcript_grows_by_two_per_successful_turn() {
        let llm = ScriptedLlm::with_replies(&[
            "SELECT COUNT(*) FROM orders",
            "There are 3 orders.",
            "SELECT COUNT(*) FROM customers",
            "There are 2 customers.",
            "SELECT COUNT(*) FROM products",
            "There are 5 products.",
        ]);
        let (mut session, _) =
            connected_session(Ok(count_result(3)), llm.clone(), SessionOptions::default()).await;

        for (n, question) in ["orders?", "customers?", "products?"].iter().enumerate() {
            session.send_message(question).await.unwrap();
            assert_eq!(session.transcript().len(), 2 * (n + 1));
        }

        // Later SQL prompts carry the earlier exchanges, oldest first.
        let third_sql_prompt = &llm.prompts()[4];
        let first = third_sql_prompt.find("Human: orders?").unwrap();
        let second = third_sql_prompt.find("AI: There are 3 orders.").unwrap();
        let third = third_sql_prompt.find("Human: customers?").unwrap();
        assert!(first < second && second < third);
        assert!(!third_sql_prompt.contains("Human: products?"));
    }

    #[tokio::test]
    async fn test_empty_sql_response_aborts_without_execution() {
        let llm = ScriptedLlm::with_replies(&["   "]);
        let (mut session, probe) =
            connected_session(Ok(count_result(1)), llm, SessionOptions::default()).await;

        let err = session.send_message("how many orders today?").await.unwrap_err();

        assert_eq!(err, SessionError::Llm(LlmError::EmptyResponse));
        assert!(probe.executed().is_empty());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.transcript().len(), 1);
        assert!(session.transcript().last().unwrap().is_human());
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_turn() {
        let llm = Arc::new(ScriptedLlm::default());
        llm.push(Err(LlmError::Provider("503 Service Unavailable".to_string())));
        let (mut session, probe) =
            connected_session(Ok(count_result(1)), llm, SessionOptions::default()).await;

        let err = session.send_message("anything").await.unwrap_err();

        assert_eq!(err.code(), "LLM_ERROR");
        assert!(probe.executed().is_empty());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_query_error_keeps_human_turn_only() {
        let llm = ScriptedLlm::with_replies(&["SELECT nope FROM orders", "unused"]);
        let (mut session, probe) = connected_session(
            Err(GatewayError::Query(
                "Unknown column 'nope' in 'field list'".to_string(),
            )),
            llm.clone(),
            SessionOptions::default(),
        )
        .await;

        let err = session.send_message("show me nope").await.unwrap_err();

        assert!(matches!(err, SessionError::Query(_)));
        assert!(err.to_string().contains("Unknown column 'nope'"));
        assert_eq!(probe.executed().len(), 1);
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(
            session.transcript().turns()[0],
            ConversationTurn::human("show me nope")
        );
        // The answer prompt was never sent.
        assert_eq!(llm.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_aborts_turn() {
        let llm = ScriptedLlm::with_replies(&["SELECT COUNT(*) FROM orders", "\n"]);
        let (mut session, probe) =
            connected_session(Ok(count_result(2)), llm, SessionOptions::default()).await;

        let err = session.send_message("orders?").await.unwrap_err();

        assert_eq!(err, SessionError::Llm(LlmError::EmptyResponse));
        assert_eq!(probe.executed().len(), 1);
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_lost_connection_returns_to_disconnected() {
        let llm = ScriptedLlm::with_replies(&["SELECT 1", "unused"]);
        let (mut session, _) = connected_session(
            Err(GatewayError::ConnectionLost("broken pipe".to_string())),
            llm,
            SessionOptions::default(),
        )
        .await;

        let err = session.send_message("ping").await.unwrap_err();

        assert_eq!(err.code(), "CONNECTION_LOST");
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.connection().is_none());
        assert_eq!(
            session.send_message("again").await.unwrap_err(),
            SessionError::NotConnected
        );
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_no_message_or_connect_while_turn_in_flight() {
        let llm = ScriptedLlm::with_replies(&["SELECT 1", "one"]);
        let (mut session, probe) =
            connected_session(Ok(count_result(1)), llm.clone(), SessionOptions::default()).await;

        for state in [SessionState::AwaitingSql, SessionState::AwaitingAnswer] {
            session.state = state;
            assert_eq!(
                session.send_message("second").await.unwrap_err(),
                SessionError::Busy
            );
            assert_eq!(
                session.connect(&shop_credentials()).await.unwrap_err(),
                SessionError::Busy
            );
        }

        assert!(session.transcript().is_empty());
        assert!(llm.prompts().is_empty());
        assert!(probe.executed().is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected_without_recording() {
        let llm = ScriptedLlm::with_replies(&[]);
        let (mut session, _) =
            connected_session(Ok(count_result(1)), llm, SessionOptions::default()).await;

        let err = session.send_message("   ").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(session.transcript().is_empty());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_question_is_recorded_and_prompted_verbatim() {
        let llm = ScriptedLlm::with_replies(&["SELECT COUNT(*) FROM orders", "3 orders."]);
        let (mut session, _) =
            connected_session(Ok(count_result(3)), llm.clone(), SessionOptions::default()).await;

        let question = "  how many orders?\n";
        session.send_message(question).await.unwrap();

        assert_eq!(session.transcript().turns()[0], ConversationTurn::human(question));
        assert!(llm.prompts()[0].contains(&format!("Question: {}", question)));
    }

    #[tokio::test]
    async fn test_schema_is_refetched_every_turn_by_default() {
        let llm = ScriptedLlm::with_replies(&["SELECT 1", "a", "SELECT 2", "b"]);
        let (mut session, probe) =
            connected_session(Ok(count_result(1)), llm, SessionOptions::default()).await;

        session.send_message("one").await.unwrap();
        session.send_message("two").await.unwrap();
        assert_eq!(probe.schema_fetches(), 2);
    }

    #[tokio::test]
    async fn test_cached_schema_is_invalidated_on_reconnect() {
        let llm = ScriptedLlm::with_replies(&["SELECT 1", "a", "SELECT 2", "b", "SELECT 3", "c"]);
        let options = SessionOptions { cache_schema: true };
        let (mut session, probe) = connected_session(Ok(count_result(1)), llm, options).await;

        session.send_message("one").await.unwrap();
        session.send_message("two").await.unwrap();
        assert_eq!(probe.schema_fetches(), 1);

        session.connect(&shop_credentials()).await.unwrap();
        session.send_message("three").await.unwrap();
        assert_eq!(probe.schema_fetches(), 2);
    }

    #[tokio::test]
    async fn test_failed_reconnect_keeps_existing_handle() {
        let llm = ScriptedLlm::with_replies(&[]);
        let (mut session, _) =
            connected_session(Ok(count_result(1)), llm, SessionOptions::default()).await;

        let bad = ConnectionCredentials::mysql("localhost", "root", "wrong", "other");
        assert!(session.connect(&bad).await.is_err());

        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.connection().unwrap().database, "shop");
    }

    #[tokio::test]
    async fn test_read_only_policy_blocks_writes_before_execution() {
        let llm = ScriptedLlm::with_replies(&["DELETE FROM orders", "unused"]);
        let (gateway, probe) = FakeGateway::returning(Ok(QueryOutput::Affected {
            rows_affected: 10,
        }));
        let mut session =
            SessionController::new(Arc::new(gateway), llm, SessionOptions::default())
                .with_sql_policy(Arc::new(ReadOnlySql));
        session.connect(&shop_credentials()).await.unwrap();

        let err = session.send_message("delete all orders").await.unwrap_err();

        assert_eq!(err.code(), "SQL_REJECTED");
        assert!(probe.executed().is_empty());
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_read_only_policy_blocks_write_behind_cte() {
        let llm = ScriptedLlm::with_replies(&["WITH x AS (SELECT 1) DELETE FROM orders"]);
        let (gateway, probe) = FakeGateway::returning(Ok(QueryOutput::Affected {
            rows_affected: 10,
        }));
        let mut session =
            SessionController::new(Arc::new(gateway), llm, SessionOptions::default())
                .with_sql_policy(Arc::new(ReadOnlySql));
        session.connect(&shop_credentials()).await.unwrap();

        let err = session.send_message("wipe the orders").await.unwrap_err();

        assert_eq!(err.code(), "SQL_REJECTED");
        assert!(probe.executed().is_empty());
    }
}
