//! The query-processing state machine.
//!
//! Stages run strictly in order and each one either advances the turn or
//! ends it:
//!
//! 1. code check on the raw text
//! 2. language detection, then translation unless already English/Latin
//! 3. (multi-turn, with history) classification and reframing
//! 4. conversation summary, which may already hold the answer
//! 5. safety, consistency (multi-turn follow-ups) and relevance checks
//! 6. clarifications are answered from history; everything else goes
//!    through table selection, column selection, SQL synthesis, execution
//!    and the final answer
//! 7. the answered turn is appended to the session's context window
//!
//! A guardrail rejection is a normal outcome. A malformed model answer or a
//! database failure is an error and ends the turn with nothing returned.

use std::sync::Arc;

use askdb_core::{
    AskDbError, CostLedger, GuardrailCheck, JsonLlm, LlmJsonRequest, LlmJsonResponse, LlmOutput,
    LlmSettings, Outcome, PipelineResult, Query, QueryType, Stage, StageTimer, Value,
};
use askdb_guardrails::{CheckOutcome, GuardrailEngine};
use askdb_memory::{ContextEntry, ConversationSummarizer, QueryReframer};
use askdb_prompt::language::{
    detect_language_prompt, translation_prompt, LANGUAGE_SYSTEM_MESSAGE,
    TRANSLATION_SYSTEM_MESSAGE,
};
use askdb_prompt::pipeline::{
    best_columns_prompt, best_tables_prompt, final_answer_prompt, sql_prompt, SqlPromptInput,
};
use askdb_sql::DatabaseTools;
use tracing::{debug, info, info_span, Instrument};

use crate::{PipelineConfig, PipelineMode, Session};

/// Everything one `process_query` call accumulates.
struct TurnState {
    result: PipelineResult,
    ledger: CostLedger,
    /// The question as the later stages see it: translated, then reframed.
    working: Query,
    language: String,
    script: String,
    summary: String,
}

impl TurnState {
    fn new(query: &Query, config: &PipelineConfig) -> Self {
        let mut result = PipelineResult::new(query.clone(), config.mode.checks());
        result.model_used = config.llm.clone();
        result.guardrails_model = config.guardrails_llm.clone();
        Self {
            result,
            ledger: CostLedger::new(),
            working: query.clone(),
            language: String::new(),
            script: String::new(),
            summary: String::new(),
        }
    }

    fn absorb<T>(&mut self, stage: Stage, output: LlmOutput<T>) -> T {
        self.result.record_prompt(stage, output.prompt);
        self.ledger.add_processing(output.cost);
        output.value
    }

    fn reject(mut self, outcome: CheckOutcome) -> PipelineResult {
        self.result.text_response = outcome.response.unwrap_or_default();
        self.finish(Outcome::Rejected(outcome.check))
    }

    fn finish(mut self, outcome: Outcome) -> PipelineResult {
        self.result.outcome = outcome;
        self.result.settle(&self.ledger);
        self.result
    }
}

fn is_english_latin(language: &str, script: &str) -> bool {
    language.trim().eq_ignore_ascii_case("english") && script.trim().eq_ignore_ascii_case("latin")
}

/// Translated metadata that carries nothing; the untranslated value is kept.
fn is_blank(metadata: &Value) -> bool {
    match metadata {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Immutable after construction; one instance serves every session.
pub struct QueryProcessor {
    llm: Arc<dyn JsonLlm>,
    tools: Arc<DatabaseTools>,
    config: PipelineConfig,
    settings: LlmSettings,
    guardrails: GuardrailEngine,
    summarizer: ConversationSummarizer,
    reframer: QueryReframer,
}

impl QueryProcessor {
    /// Uses `llm` for both processing and guardrail stages.
    pub fn new(
        llm: Arc<dyn JsonLlm>,
        tools: Arc<DatabaseTools>,
        config: PipelineConfig,
    ) -> Result<Self, AskDbError> {
        Self::with_guardrails_llm(llm.clone(), llm, tools, config)
    }

    pub fn with_guardrails_llm(
        llm: Arc<dyn JsonLlm>,
        guardrails_llm: Arc<dyn JsonLlm>,
        tools: Arc<DatabaseTools>,
        config: PipelineConfig,
    ) -> Result<Self, AskDbError> {
        config.validate()?;
        let settings = LlmSettings::new(config.llm.clone(), config.system_message.clone())
            .with_temperature(config.temperature)
            .with_api_key(config.api_key.clone());
        let guardrail_settings =
            LlmSettings::new(config.guardrails_llm.clone(), config.system_message.clone())
                .with_temperature(config.guardrails_temperature)
                .with_api_key(config.api_key.clone());

        Ok(Self {
            guardrails: GuardrailEngine::with_settings(guardrails_llm, guardrail_settings),
            summarizer: ConversationSummarizer::new(llm.clone(), settings.clone()),
            reframer: QueryReframer::new(llm.clone(), settings.clone()),
            llm,
            tools,
            config,
            settings,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<DatabaseTools> {
        &self.tools
    }

    /// A fresh session with this pipeline's context length.
    pub fn new_session(&self, db: Arc<dyn askdb_sql::SqlDatabase>) -> Session {
        Session::new(db, self.config.context_length)
    }

    pub async fn process_query(
        &self,
        query: &Query,
        session: &mut Session,
    ) -> Result<PipelineResult, AskDbError> {
        let span = info_span!(
            "pipeline",
            db_id = %self.config.db_id,
            mode = %self.config.mode,
        );
        self.run(query, session).instrument(span).await
    }

    async fn run(&self, query: &Query, session: &mut Session) -> Result<PipelineResult, AskDbError> {
        let mut turn = TurnState::new(query, &self.config);

        let code = self
            .guardrails
            .check_code(
                &query.query_text,
                &mut turn.result.guardrails_status,
                &mut turn.ledger,
            )
            .await?;
        turn.result.record_prompt(Stage::CodeCheck, code.prompt.clone());
        if !code.passed() {
            return Ok(turn.reject(code));
        }

        self.detect_language(&mut turn).await?;
        self.translate(&mut turn).await?;

        let question_type = self.classify_and_reframe(&mut turn, session).await?;

        if !session.context().is_empty() {
            let timer = StageTimer::start(Stage::ConversationSummary);
            let output = self
                .summarizer
                .summarize(&turn.working, session.context(), &turn.language, &turn.script)
                .await;
            timer.finish(&mut turn.ledger);
            let summary = turn.absorb(Stage::ConversationSummary, output?);
            turn.summary = summary.summary.clone();
            turn.result.conversation_summary = summary.summary;
            if let Some(answer) = summary.final_answer {
                debug!("conversation summary already answers the question");
                turn.result.text_response = answer;
                return Ok(turn.finish(Outcome::AnsweredFromSummary));
            }
        }

        let rejection = self
            .run_policy_checks(&mut turn, session, question_type)
            .await?;
        if let Some(rejection) = rejection {
            return Ok(turn.reject(rejection));
        }

        let outcome = if question_type == Some(QueryType::Clarification) {
            let timer = StageTimer::start(Stage::AnswerFromHistory);
            let output = self
                .reframer
                .answer_from_history(
                    &turn.working.query_text,
                    session.context(),
                    &turn.language,
                    &turn.script,
                )
                .await;
            timer.finish(&mut turn.ledger);
            turn.result.text_response = turn.absorb(Stage::AnswerFromHistory, output?);
            Outcome::AnsweredFromHistory
        } else {
            self.answer_with_sql(&mut turn, session).await?;
            Outcome::Answered
        };

        let timer = StageTimer::start(Stage::UpdateContext);
        session.context_mut().push(ContextEntry::new(
            turn.working.query_text.clone(),
            turn.result.text_response.clone(),
            turn.result.sql_query.clone(),
        ));
        timer.finish(&mut turn.ledger);

        let result = turn.finish(outcome);
        info!(
            outcome = ?result.outcome,
            total_cost = result.total_cost,
            "query processed"
        );
        Ok(result)
    }

    /// One processing-stage round trip: records the prompt, the time and
    /// the cost.
    async fn ask(
        &self,
        turn: &mut TurnState,
        stage: Stage,
        request: LlmJsonRequest,
    ) -> Result<LlmJsonResponse, AskDbError> {
        turn.result.record_prompt(stage, request.prompt.clone());
        debug!(
            stage = %stage,
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "asking model"
        );
        let timer = StageTimer::start(stage);
        let response = self.llm.ask_json(request).await;
        let elapsed = timer.finish(&mut turn.ledger);
        let response = response?;
        turn.ledger.add_processing(response.cost);
        debug!(stage = %stage, ?elapsed, cost = response.cost, "stage finished");
        Ok(response)
    }

    /// Pipeline settings with the conversation summary as context.
    fn request(&self, turn: &TurnState, prompt: String) -> LlmJsonRequest {
        self.settings.request(prompt).with_context(turn.summary.clone())
    }

    async fn detect_language(&self, turn: &mut TurnState) -> Result<(), AskDbError> {
        let prompt = detect_language_prompt(&turn.result.query.query_text)?;
        let request = self
            .settings
            .clone()
            .with_system_message(LANGUAGE_SYSTEM_MESSAGE)
            .request(prompt);
        let response = self.ask(turn, Stage::DetectLanguage, request).await?;

        let fields = response.fields(Stage::DetectLanguage.as_str());
        turn.language = fields.text("language")?;
        turn.script = fields.text("script")?;
        turn.result.query_language = turn.language.clone();
        turn.result.query_script = turn.script.clone();
        Ok(())
    }

    async fn translate(&self, turn: &mut TurnState) -> Result<(), AskDbError> {
        if is_english_latin(&turn.language, &turn.script) {
            turn.result.eng_translation = turn.working.query_text.clone();
            return Ok(());
        }

        let prompt = translation_prompt(&turn.working, &turn.language, &turn.script)?;
        let request = self
            .settings
            .clone()
            .with_system_message(TRANSLATION_SYSTEM_MESSAGE)
            .request(prompt);
        let response = self.ask(turn, Stage::Translate, request).await?;

        let fields = response.fields(Stage::Translate.as_str());
        let query_text = fields.text("query_text")?;
        let metadata = match fields.optional_value("query_metadata")? {
            Some(metadata) if !turn.working.metadata_text().is_empty() && !is_blank(metadata) => {
                metadata.clone()
            }
            _ => turn.working.query_metadata.clone(),
        };
        turn.working = Query::new(query_text.clone()).with_metadata(metadata);
        turn.result.eng_translation = query_text;
        Ok(())
    }

    /// Multi-turn only, and only when there is history to relate to.
    async fn classify_and_reframe(
        &self,
        turn: &mut TurnState,
        session: &Session,
    ) -> Result<Option<QueryType>, AskDbError> {
        if self.config.mode != PipelineMode::MultiTurn || session.context().is_empty() {
            return Ok(None);
        }

        let timer = StageTimer::start(Stage::ClassifyQuestion);
        let output = self
            .reframer
            .classify(&turn.working.query_text, session.context())
            .await;
        timer.finish(&mut turn.ledger);
        let question_type = turn.absorb(Stage::ClassifyQuestion, output?);
        turn.result.question_type = Some(question_type);
        debug!(question_type = question_type.as_str(), "classified question");

        if question_type != QueryType::NewQuestion {
            let timer = StageTimer::start(Stage::Reframe);
            let output = self
                .reframer
                .reframe(&turn.working.query_text, session.context())
                .await;
            timer.finish(&mut turn.ledger);
            let reframed = turn.absorb(Stage::Reframe, output?);
            turn.result.updated_query_text = reframed.clone();
            turn.working = turn.working.with_text(reframed);
        }
        Ok(Some(question_type))
    }

    /// Safety, then consistency for multi-turn follow-ups and
    /// clarifications, then relevance. Returns the first rejection.
    async fn run_policy_checks(
        &self,
        turn: &mut TurnState,
        session: &Session,
        question_type: Option<QueryType>,
    ) -> Result<Option<CheckOutcome>, AskDbError> {
        let text = turn.working.query_text.clone();

        let safety = self
            .guardrails
            .check_safety(
                &text,
                &turn.language,
                &turn.script,
                &turn.summary,
                &mut turn.result.guardrails_status,
                &mut turn.ledger,
            )
            .await?;
        turn.result.record_prompt(Stage::SafetyCheck, safety.prompt.clone());
        if !safety.passed() {
            return Ok(Some(safety));
        }

        let needs_consistency = turn
            .result
            .guardrails_status
            .is_configured(GuardrailCheck::Consistency)
            && matches!(
                question_type,
                Some(QueryType::FollowUp) | Some(QueryType::Clarification)
            );
        if needs_consistency {
            let consistency = self
                .guardrails
                .check_consistency(
                    &text,
                    &turn.language,
                    &turn.script,
                    &session.context().render_recent_first(),
                    &mut turn.result.guardrails_status,
                    &mut turn.ledger,
                )
                .await?;
            turn.result
                .record_prompt(Stage::ConsistencyCheck, consistency.prompt.clone());
            if !consistency.passed() {
                return Ok(Some(consistency));
            }
        }

        let relevance = self
            .guardrails
            .check_relevance(
                &text,
                &turn.language,
                &turn.script,
                &self.config.table_description,
                &turn.summary,
                &mut turn.result.guardrails_status,
                &mut turn.ledger,
            )
            .await?;
        turn.result.record_prompt(Stage::RelevanceCheck, relevance.prompt.clone());
        if !relevance.passed() {
            return Ok(Some(relevance));
        }
        Ok(None)
    }

    /// Tables, columns, SQL, execution and the final answer.
    async fn answer_with_sql(&self, turn: &mut TurnState, session: &Session) -> Result<(), AskDbError> {
        let db = session.database();
        let db_id = self.config.db_id.as_str();

        let prompt = best_tables_prompt(&turn.working, &self.config.table_description)?;
        let request = self.request(turn, prompt);
        let response = self.ask(turn, Stage::BestTables, request).await?;
        turn.result.best_tables = response
            .fields(Stage::BestTables.as_str())
            .string_list("response_sources")?;

        let timer = StageTimer::start(Stage::BestColumns);
        let schemas = self
            .tools
            .get_tables_schema(db, &turn.result.best_tables, db_id)
            .await;
        timer.finish(&mut turn.ledger);
        turn.result.relevant_schemas = schemas?.render()?;
        let prompt = best_columns_prompt(
            &turn.working,
            &turn.result.relevant_schemas,
            &self.config.column_description,
        )?;
        let request = self.request(turn, prompt);
        let response = self.ask(turn, Stage::BestColumns, request).await?;
        turn.result.best_columns = response.fields(Stage::BestColumns.as_str()).table_columns()?;

        let timer = StageTimer::start(Stage::SqlSynthesis);
        let common_values = self
            .tools
            .get_common_column_values(
                db,
                &turn.result.best_columns,
                db_id,
                self.config.num_common_values,
                &self.config.indicator_vars,
            )
            .await;
        timer.finish(&mut turn.ledger);
        let common_values = common_values?.render()?;
        let prompt = sql_prompt(SqlPromptInput {
            query: &turn.working,
            db_type: &self.config.db_type,
            relevant_schemas: &turn.result.relevant_schemas,
            common_values: &common_values,
            columns_description: &self.config.column_description,
            num_common_values: self.config.num_common_values,
            indicator_vars: &self.config.indicator_vars,
        })?;
        let request = self.request(turn, prompt);
        let response = self.ask(turn, Stage::SqlSynthesis, request).await?;
        turn.result.sql_query = response.fields(Stage::SqlSynthesis.as_str()).text("sql")?;

        let timer = StageTimer::start(Stage::ExecuteSql);
        let rows = self.tools.run_sql(db, &turn.result.sql_query, db_id).await;
        timer.finish(&mut turn.ledger);
        let rows = rows?;
        let sql_result = rows.render()?;
        turn.result.sql_result = Some(serde_json::to_value(&rows)?);

        let prompt = final_answer_prompt(
            &turn.working,
            &turn.result.sql_query,
            &sql_result,
            &turn.language,
            &turn.script,
        )?;
        let request = self.request(turn, prompt);
        let response = self.ask(turn, Stage::FinalAnswer, request).await?;
        turn.result.text_response = response.fields(Stage::FinalAnswer.as_str()).text("answer")?;
        Ok(())
    }
}
