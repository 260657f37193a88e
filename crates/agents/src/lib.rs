mod specialists;

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use sage_constants::ConstantsTable;
use sage_core::{
    classification_prompt, coerce_subject_token, empty_input_reply, general_prompt,
    normalize_text, ChatInput, ConversationSession, ConversationTurn, Subject, TutorReply,
};
use sage_llm::TextGenerator;
use sage_observability::AppMetrics;
use sage_storage::TranscriptRepository;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub use specialists::{MathSpecialist, PhysicsSpecialist, SpecialistAnswer};

const SESSION_TTL_HOURS: i64 = 24;
const MAX_TURNS_PER_SESSION: usize = 40;

/// Routes each query to exactly one specialist (or the general path) and
/// returns a labeled reply. Stateless per query.
pub struct TutorAgent<G, S>
where
    G: TextGenerator,
    S: TranscriptRepository,
{
    generator: Arc<G>,
    math: MathSpecialist<G>,
    physics: PhysicsSpecialist<G>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<G, S> TutorAgent<G, S>
where
    G: TextGenerator,
    S: TranscriptRepository,
{
    pub fn new(
        generator: Arc<G>,
        constants: ConstantsTable,
        store: Arc<S>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            math: MathSpecialist::new(generator.clone()),
            physics: PhysicsSpecialist::new(generator.clone(), constants),
            generator,
            store,
            metrics,
        }
    }

    /// Math keywords, then physics keywords, then the model fallback. The
    /// first claiming stage wins; every failure mode lands on `General`.
    async fn classify(&self, query: &str) -> Subject {
        if self.math.can_handle(query) {
            return Subject::Math;
        }

        if self.physics.can_handle(query) {
            return Subject::Physics;
        }

        self.metrics.inc_generation_call();
        match self.generator.generate(&classification_prompt(query)).await {
            Ok(raw) => {
                let token = raw.trim().to_uppercase();
                let subject = coerce_subject_token(&token);
                if subject == Subject::General && token != "GENERAL" {
                    warn!(token = %token, "unrecognized classification token");
                    self.metrics.inc_classifier_fallback();
                }
                subject
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "classification failed");
                self.metrics.inc_classifier_fallback();
                Subject::General
            }
        }
    }

    /// Sole upward entry point; every error path folds into a returned
    /// apology string.
    #[instrument(skip(self, query))]
    pub async fn route(&self, query: &str) -> TutorReply {
        let started = Instant::now();
        self.metrics.inc_request();

        if query.trim().is_empty() {
            self.metrics.observe_latency(started.elapsed());
            return TutorReply {
                reply_text: empty_input_reply(),
                subject: Subject::General,
                calculations: Vec::new(),
                constants_cited: Vec::new(),
                json_payload: serde_json::json!({ "empty_input": true }),
            };
        }

        let normalized = normalize_text(query);
        let subject = self.classify(&normalized).await;

        let mut reply = match subject {
            Subject::Math => {
                self.metrics.inc_generation_call();
                let answer = self.math.answer(&normalized).await;
                self.metrics.add_calculations(answer.calculations.len());
                if answer.generation_failed {
                    self.metrics.inc_apology();
                }
                self.labeled(subject, answer)
            }
            Subject::Physics => {
                self.metrics.inc_generation_call();
                let answer = self.physics.answer(&normalized).await;
                if answer.generation_failed {
                    self.metrics.inc_apology();
                }
                self.labeled(subject, answer)
            }
            Subject::General => {
                self.metrics.inc_generation_call();
                match self.generator.generate(&general_prompt(&normalized)).await {
                    Ok(text) => self.labeled(
                        subject,
                        SpecialistAnswer {
                            text,
                            calculations: Vec::new(),
                            constants_cited: Vec::new(),
                            generation_failed: false,
                        },
                    ),
                    Err(error) => {
                        self.metrics.inc_apology();
                        warn!(error = %format!("{error:#}"), "general generation failed");
                        TutorReply {
                            reply_text: sage_core::apology_reply(&format!("{error:#}")),
                            subject,
                            calculations: Vec::new(),
                            constants_cited: Vec::new(),
                            json_payload: serde_json::json!({ "apology": true }),
                        }
                    }
                }
            }
        };

        if let Some(payload) = reply.json_payload.as_object_mut() {
            payload.insert(
                "model".to_string(),
                serde_json::json!(self.generator.model_name()),
            );
        }

        self.metrics.observe_latency(started.elapsed());
        info!(
            subject = ?reply.subject,
            calculations = reply.calculations.len(),
            constants = reply.constants_cited.len(),
            "query routed"
        );

        reply
    }

    /// Route, then append the turn to the session transcript. A storage
    /// failure is logged and the reply still returned.
    pub async fn handle_chat(&self, input: ChatInput) -> TutorReply {
        let mut reply = self.route(&input.text).await;

        let session_id = input
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Err(error) = self
            .persist_turn(&session_id, input.user_id.as_deref(), &input.text, &reply)
            .await
        {
            warn!(
                session_id = %session_id,
                error = %format!("{error:#}"),
                "failed persisting transcript turn"
            );
        }

        if let Some(payload) = reply.json_payload.as_object_mut() {
            payload.insert("session_id".to_string(), serde_json::json!(session_id));
        }

        reply
    }

    pub fn capabilities(&self) -> String {
        "Sage Tutor capabilities:\n\n\
         Mathematics specialist\n\
         - Algebra, calculus, geometry, trigonometry\n\
         - Step-by-step equation solving\n\
         - Deterministic evaluation of arithmetic found in your question\n\n\
         Physics specialist\n\
         - Classical mechanics, thermodynamics, electromagnetism\n\
         - Answers grounded with a physical constants table\n\n\
         Ask a specific question like \"What is Newton's second law?\" or \
         \"Solve 2x + 5 = 11\" and it is routed to the right specialist \
         automatically."
            .to_string()
    }

    fn labeled(&self, subject: Subject, answer: SpecialistAnswer) -> TutorReply {
        TutorReply {
            reply_text: format!("**{}:**\n\n{}", subject.label(), answer.text),
            subject,
            json_payload: serde_json::json!({
                "subject": subject,
                "calculations": &answer.calculations,
                "constants_cited": &answer.constants_cited,
            }),
            calculations: answer.calculations,
            constants_cited: answer.constants_cited,
        }
    }

    async fn persist_turn(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        user_text: &str,
        reply: &TutorReply,
    ) -> anyhow::Result<()> {
        let mut session = self
            .store
            .load_session(session_id)
            .await?
            .unwrap_or_else(|| ConversationSession {
                session_id: session_id.to_string(),
                user_id: None,
                expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
                turns: Vec::new(),
            });

        if let Some(user_id) = user_id {
            session.user_id = Some(user_id.to_string());
        }
        session.expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
        session.turns.push(ConversationTurn {
            at: Utc::now(),
            user_text: user_text.to_string(),
            assistant_text: reply.reply_text.clone(),
            subject: reply.subject,
        });

        if session.turns.len() > MAX_TURNS_PER_SESSION {
            let keep_from = session.turns.len() - MAX_TURNS_PER_SESSION;
            session.turns = session.turns.split_off(keep_from);
        }

        self.store.upsert_session(&session).await
    }
}
