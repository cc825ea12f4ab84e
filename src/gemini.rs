use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::bundle::{GenerationRequest, StudyBundle, Subject};

macro_rules! debug_println {
    ($($arg:tt)*) => {
        if std::env::var("STUDYGENIE_DEBUG").is_ok() {
            eprintln!($($arg)*);
        }
    };
}

const FALLBACK_ANSWER: &str = "I couldn't generate a detailed answer. Please try again.";

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Part { text: Some(text), inline_data: None }
    }

    fn jpeg(data: String) -> Self {
        Part {
            text: None,
            inline_data: Some(InlineData { mime_type: "image/jpeg".to_string(), data }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn with_config(base_url: String, model: String, api_key: String) -> Self {
        GeminiClient {
            base_url,
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Generate a structured study bundle for the request. The prompt pins
    /// tone to the grade, switches the output to Urdu script when the
    /// subject is Urdu, and carries the user's custom instruction verbatim.
    pub async fn create_study_bundle(
        &self,
        request: &GenerationRequest,
        custom_instruction: &str,
    ) -> Result<StudyBundle> {
        let prompt = bundle_prompt(request, custom_instruction);
        debug_println!("[Gemini] Bundle prompt:\n{}", prompt);

        let body = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part::text(prompt)] }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: bundle_schema(),
            }),
        };

        let text = self
            .generate(&body)
            .await?
            .ok_or_else(|| anyhow!("No response received from the model."))?;
        debug_println!("[Gemini] Bundle response:\n{}", text);

        parse_bundle(&text)
    }

    /// Free-text tutoring answer. The held image, when present, rides along
    /// as an inline JPEG part of the same request.
    pub async fn solve_question(
        &self,
        subject: Subject,
        grade: &str,
        question: &str,
        image_jpeg: Option<&[u8]>,
        custom_instruction: &str,
    ) -> Result<String> {
        let prompt = solve_prompt(subject, grade, question, custom_instruction);
        debug_println!("[Gemini] Solve prompt:\n{}", prompt);

        let mut parts = vec![Part::text(prompt)];
        if let Some(bytes) = image_jpeg {
            let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
            parts.push(Part::jpeg(encoded));
        }

        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: None,
        };

        let text = self.generate(&body).await?;
        Ok(text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string()))
    }

    async fn generate(&self, body: &GenerateContentRequest) -> Result<Option<String>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({}): {}", status, body));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.is_empty());

        Ok(text)
    }
}

/// Parse the model's structured output into a bundle, check its shape, and
/// stamp a fresh identifier and timestamp over whatever the model produced.
pub fn parse_bundle(text: &str) -> Result<StudyBundle> {
    let mut bundle: StudyBundle = serde_json::from_str(text)
        .context("model output did not parse as a study bundle")?;
    bundle.validate_shape()?;
    bundle.id = uuid::Uuid::new_v4().to_string();
    bundle.created_at = chrono::Utc::now().timestamp_millis();
    Ok(bundle)
}

fn bundle_prompt(request: &GenerationRequest, custom_instruction: &str) -> String {
    let mut language_instruction = format!(
        "Ensure the tone and complexity are perfect for Grade {}.",
        request.grade
    );
    if request.subject == Subject::Urdu {
        language_instruction.push_str(
            "\nCRITICAL INSTRUCTION: Since the subject is Urdu, the ENTIRE OUTPUT \
             MUST BE GENERATED IN THE URDU LANGUAGE (Urdu Script).",
        );
    }

    let mut prompt = format!(
        "You are an expert curriculum developer for {} publications.\n\
         Create a study course for a Grade {} student in the subject of {}.\n\
         The specific topic is: \"{}\".\n\n{}\n",
        request.publisher, request.grade, request.subject, request.topic, language_instruction
    );

    if !custom_instruction.trim().is_empty() {
        prompt.push_str(&format!("\nAdditional user instructions: {}\n", custom_instruction));
    }

    prompt.push_str(
        "\nGenerate the following:\n\
         1. A Simple Summary.\n\
         2. Flashcards with explanations.\n\
         3. Fill in the blanks.\n\
         4. True/False Questions.\n\
         5. Scenario Based Questions.",
    );

    prompt
}

fn solve_prompt(subject: Subject, grade: &str, question: &str, custom_instruction: &str) -> String {
    let mut prompt = format!(
        "You are a highly detailed and helpful tutor.\n\
         Explain the following question or problem in great detail for a Grade {} student.\n\
         Subject: {}\n\
         Topic/Question: {}\n",
        grade, subject, question
    );

    if subject == Subject::Urdu {
        prompt.push_str("\nIMPORTANT: Answer extensively in Urdu script. Use clear, educational Urdu.\n");
    }

    if !custom_instruction.trim().is_empty() {
        prompt.push_str(&format!("\nAdditional user instructions: {}\n", custom_instruction));
    }

    prompt.push_str(
        "\nYour answer should include:\n\
         1. A detailed explanation of the concept.\n\
         2. Step-by-step reasoning if it's a problem.\n\
         3. Real-world examples or analogies.\n\
         4. A summary of key points to remember.\n\n\
         Make the response long, thorough, and easy to read.",
    );

    prompt
}

/// Response schema submitted with every bundle request so the model's output
/// is machine-parseable. Shape mirrors the StudyBundle data model.
fn bundle_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "topic": { "type": "STRING", "description": "The topic provided by the user" },
            "grade": { "type": "STRING", "description": "The grade level" },
            "subject": { "type": "STRING", "description": "The subject" },
            "summary": {
                "type": "STRING",
                "description": "A comprehensive yet simple summary of the topic suitable for the grade level."
            },
            "flashcards": {
                "type": "ARRAY",
                "description": "A list of 5-10 flashcards for study.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "front": { "type": "STRING", "description": "Question or term on the front" },
                        "back": { "type": "STRING", "description": "Answer or definition on the back" },
                        "explanation": {
                            "type": "STRING",
                            "description": "Additional context, mnemonic, or simple explanation to help memorize the answer."
                        }
                    },
                    "required": ["front", "back", "explanation"]
                }
            },
            "fillInTheBlanks": {
                "type": "ARRAY",
                "description": "5 fill-in-the-blank exercises.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "sentence": {
                            "type": "STRING",
                            "description": "The sentence with '_____' representing the missing word."
                        },
                        "answer": { "type": "STRING", "description": "The missing word." }
                    },
                    "required": ["sentence", "answer"]
                }
            },
            "trueFalse": {
                "type": "ARRAY",
                "description": "5 true or false questions.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "statement": { "type": "STRING", "description": "The statement to evaluate." },
                        "isTrue": { "type": "BOOLEAN", "description": "Whether the statement is true." },
                        "explanation": { "type": "STRING", "description": "Brief explanation of why." }
                    },
                    "required": ["statement", "isTrue", "explanation"]
                }
            },
            "scenarios": {
                "type": "ARRAY",
                "description": "3 scenario-based multiple choice questions.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "scenario": {
                            "type": "STRING",
                            "description": "A short real-world scenario related to the topic."
                        },
                        "question": { "type": "STRING", "description": "The question based on the scenario." },
                        "options": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "4 possible answers."
                        },
                        "correctAnswerIndex": {
                            "type": "INTEGER",
                            "description": "The index (0-3) of the correct answer."
                        },
                        "explanation": { "type": "STRING", "description": "Why the answer is correct." }
                    },
                    "required": ["scenario", "question", "options", "correctAnswerIndex", "explanation"]
                }
            }
        },
        "required": ["topic", "grade", "subject", "summary", "flashcards", "fillInTheBlanks", "trueFalse", "scenarios"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        let bundle = StudyBundle::sample();
        serde_json::to_string(&bundle).unwrap()
    }

    #[test]
    fn parse_bundle_stamps_fresh_identity() {
        let text = sample_json();
        let first = parse_bundle(&text).unwrap();
        let second = parse_bundle(&text).unwrap();

        // The model-provided id must never survive parsing.
        assert_ne!(first.id, "test-bundle");
        assert!(!first.id.is_empty());
        assert_ne!(first.id, second.id);
        assert!(first.created_at > 1_700_000_000_000);
    }

    #[test]
    fn parse_bundle_keeps_section_counts() {
        let bundle = parse_bundle(&sample_json()).unwrap();
        assert!((5..=10).contains(&bundle.flashcards.len()));
        assert_eq!(bundle.fill_in_the_blanks.len(), 5);
        assert_eq!(bundle.true_false.len(), 5);
        assert_eq!(bundle.scenarios.len(), 3);
    }

    #[test]
    fn parse_bundle_rejects_garbage() {
        assert!(parse_bundle("not json at all").is_err());
        assert!(parse_bundle("{\"topic\": \"only a topic\"}").is_err());
    }

    #[test]
    fn parse_bundle_rejects_wrong_shape() {
        let mut bundle = StudyBundle::sample();
        bundle.true_false.pop();
        let text = serde_json::to_string(&bundle).unwrap();
        assert!(parse_bundle(&text).is_err());
    }

    fn request(subject: Subject) -> GenerationRequest {
        GenerationRequest {
            topic: "Fractions".to_string(),
            grade: "4".to_string(),
            subject,
            publisher: "Oxford".to_string(),
        }
    }

    #[test]
    fn bundle_prompt_pins_grade_and_publisher() {
        let prompt = bundle_prompt(&request(Subject::Mathematics), "");
        assert!(prompt.contains("Grade 4"));
        assert!(prompt.contains("Oxford publications"));
        assert!(prompt.contains("\"Fractions\""));
        assert!(!prompt.contains("Urdu Script"));
        assert!(!prompt.contains("Additional user instructions"));
    }

    #[test]
    fn urdu_subject_mandates_urdu_script() {
        let prompt = bundle_prompt(&request(Subject::Urdu), "");
        assert!(prompt.contains("URDU LANGUAGE (Urdu Script)"));

        let solve = solve_prompt(Subject::Urdu, "7", "what is a ghazal?", "");
        assert!(solve.contains("Urdu script"));
        let solve = solve_prompt(Subject::Science, "7", "why is the sky blue?", "");
        assert!(!solve.contains("Urdu script"));
    }

    #[test]
    fn custom_instruction_is_appended_verbatim() {
        let prompt = bundle_prompt(&request(Subject::Science), "Always include a joke.");
        assert!(prompt.contains("Additional user instructions: Always include a joke."));

        let solve = solve_prompt(Subject::Science, "7", "q", "Use metric units.");
        assert!(solve.contains("Additional user instructions: Use metric units."));
    }

    #[test]
    fn schema_requires_every_section() {
        let schema = bundle_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for field in ["topic", "grade", "subject", "summary", "flashcards", "fillInTheBlanks", "trueFalse", "scenarios"] {
            assert!(required.contains(&field), "missing {}", field);
        }
        assert_eq!(schema["properties"]["scenarios"]["items"]["properties"]["correctAnswerIndex"]["type"], "INTEGER");
    }
}
