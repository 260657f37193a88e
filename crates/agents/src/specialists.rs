use std::sync::Arc;

use sage_calc::{evaluate, extract_expressions, format_number};
use sage_constants::{scan_for_constants, ConstantsTable};
use sage_core::{
    matches_keywords, math_prompt, physics_prompt, strip_marked_region, CalculationLine,
    MATH_KEYWORDS, PHYSICS_KEYWORDS, THINK_END, THINK_START,
};
use sage_llm::TextGenerator;
use tracing::warn;

/// A specialist's answer, before the dispatcher labels it.
#[derive(Debug, Clone)]
pub struct SpecialistAnswer {
    pub text: String,
    pub calculations: Vec<CalculationLine>,
    pub constants_cited: Vec<String>,
    /// True when `text` is the variant-local apology.
    pub generation_failed: bool,
}

pub struct MathSpecialist<G> {
    generator: Arc<G>,
}

impl<G: TextGenerator> MathSpecialist<G> {
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    pub fn can_handle(&self, query: &str) -> bool {
        matches_keywords(query, MATH_KEYWORDS)
    }

    /// Sub-expressions are extracted from the original query, not the model
    /// output. Per-expression failures render inline and never abort the
    /// answer.
    pub async fn answer(&self, query: &str) -> SpecialistAnswer {
        let text = match self.generator.generate(&math_prompt(query)).await {
            Ok(raw) => strip_marked_region(&raw, THINK_START, THINK_END),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "math generation failed");
                return SpecialistAnswer {
                    text: format!(
                        "I apologize, but I encountered an error while processing your math \
                         question: {error:#}"
                    ),
                    calculations: Vec::new(),
                    constants_cited: Vec::new(),
                    generation_failed: true,
                };
            }
        };

        let calculations = extract_expressions(query)
            .into_iter()
            .map(|expression| match evaluate(&expression) {
                Ok(value) => CalculationLine {
                    rendered: format_number(value),
                    expression,
                    failed: false,
                },
                Err(error) => CalculationLine {
                    rendered: format!("Error: {error}"),
                    expression,
                    failed: true,
                },
            })
            .collect::<Vec<_>>();

        let mut text = text;
        if !calculations.is_empty() {
            text.push_str("\n\n**Calculations:**\n");
            for line in &calculations {
                text.push_str(&format!("• {} = {}\n", line.expression, line.rendered));
            }
        }

        SpecialistAnswer {
            text,
            calculations,
            constants_cited: Vec::new(),
            generation_failed: false,
        }
    }
}

pub struct PhysicsSpecialist<G> {
    generator: Arc<G>,
    constants: ConstantsTable,
}

impl<G: TextGenerator> PhysicsSpecialist<G> {
    pub fn new(generator: Arc<G>, constants: ConstantsTable) -> Self {
        Self {
            generator,
            constants,
        }
    }

    pub fn can_handle(&self, query: &str) -> bool {
        matches_keywords(query, PHYSICS_KEYWORDS)
    }

    /// Constants the query alludes to are injected ahead of the question;
    /// no post-generation computation here.
    pub async fn answer(&self, query: &str) -> SpecialistAnswer {
        let scanned = scan_for_constants(query, &self.constants);
        let constants_cited = scanned
            .iter()
            .map(|constant| constant.formatted.clone())
            .collect::<Vec<_>>();

        let constants_block = if constants_cited.is_empty() {
            String::new()
        } else {
            let mut block = String::from("Relevant Physical Constants:\n");
            for formatted in &constants_cited {
                block.push_str(&format!("• {formatted}\n"));
            }
            block.push('\n');
            block
        };

        let (text, generation_failed) = match self
            .generator
            .generate(&physics_prompt(query, &constants_block))
            .await
        {
            Ok(raw) => (strip_marked_region(&raw, THINK_START, THINK_END), false),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "physics generation failed");
                (
                    format!(
                        "I apologize, but I encountered an error while processing your physics \
                         question: {error:#}"
                    ),
                    true,
                )
            }
        };

        SpecialistAnswer {
            text,
            calculations: Vec::new(),
            constants_cited,
            generation_failed,
        }
    }
}
