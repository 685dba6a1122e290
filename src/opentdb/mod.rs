use crate::engine::round::Question;
use log::{info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://opentdb.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_AMOUNT: u32 = 50;

const RESPONSE_OK: u32 = 0;
const RESPONSE_NO_RESULTS: u32 = 1;
const RESPONSE_INVALID_PARAMETER: u32 = 2;
const RESPONSE_RATE_LIMIT: u32 = 5;

#[derive(Debug, Error)]
pub enum TriviaError
{
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("not enough questions for that category and difficulty")]
    NoResults,
    #[error("the trivia service rejected the request parameters")]
    InvalidParameter,
    #[error("too many requests, wait a few seconds and try again")]
    RateLimited,
    #[error("the trivia service answered with code {0}")]
    Service(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty
{
    Easy,
    Medium,
    Hard,
}

impl Difficulty
{
    pub fn parse(value: &str) -> Option<Self>
    {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str
    {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Category
{
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizRequest
{
    pub amount: u32,
    pub category: Option<u32>,
    pub difficulty: Option<Difficulty>,
}

impl QuizRequest
{
    fn query_path(&self) -> String
    {
        let mut path = format!("/api.php?amount={}", self.amount.clamp(1, MAX_AMOUNT));
        if let Some(category) = self.category {
            path.push_str(&format!("&category={category}"));
        }
        if let Some(difficulty) = self.difficulty {
            path.push_str(&format!("&difficulty={difficulty}"));
        }
        path.push_str("&type=multiple");
        path
    }
}

pub trait QuestionSource
{
    fn fetch_categories(&self) -> Result<Vec<Category>, TriviaError>;
    fn fetch_questions(&self, request: &QuizRequest) -> Result<Vec<Question>, TriviaError>;
}

#[derive(Deserialize)]
struct CategoryResponse
{
    trivia_categories: Vec<Category>,
}

#[derive(Deserialize)]
struct QuestionResponse
{
    response_code: u32,
    #[serde(default)]
    results: Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion
{
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    question: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
}

impl From<RawQuestion> for Question
{
    fn from(raw: RawQuestion) -> Self
    {
        Question {
            prompt: decode_html(&raw.question),
            correct_answer: decode_html(&raw.correct_answer),
            distractors: raw.incorrect_answers.iter().map(|a| decode_html(a)).collect(),
            category: raw.category.map(|c| decode_html(&c)),
            difficulty: raw.difficulty,
        }
    }
}

pub struct OpenTdbClient
{
    client: Client,
    base_url: String,
}

impl OpenTdbClient
{
    /// Uses `TRIVIA_API_URL` when set, otherwise the public service.
    pub fn from_env() -> Result<Self, TriviaError>
    {
        let base_url = env::var("TRIVIA_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self, TriviaError>
    {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| TriviaError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, TriviaError>
    {
        let url = format!("{}{}", self.base_url, path);
        info!("GET {url}");
        self.client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<T>())
            .map_err(|source| {
                warn!("request to {url} failed: {source}");
                TriviaError::Http { url, source }
            })
    }
}

impl QuestionSource for OpenTdbClient
{
    fn fetch_categories(&self) -> Result<Vec<Category>, TriviaError>
    {
        let resp: CategoryResponse = self.get_json("/api_category.php")?;
        Ok(resp.trivia_categories)
    }

    fn fetch_questions(&self, request: &QuizRequest) -> Result<Vec<Question>, TriviaError>
    {
        let resp: QuestionResponse = self.get_json(&request.query_path())?;
        questions_from_response(resp)
    }
}

fn questions_from_response(resp: QuestionResponse) -> Result<Vec<Question>, TriviaError>
{
    match resp.response_code {
        RESPONSE_OK => Ok(resp.results.into_iter().map(Question::from).collect()),
        RESPONSE_NO_RESULTS => Err(TriviaError::NoResults),
        RESPONSE_INVALID_PARAMETER => Err(TriviaError::InvalidParameter),
        RESPONSE_RATE_LIMIT => Err(TriviaError::RateLimited),
        code => Err(TriviaError::Service(code)),
    }
}

/// Decodes the HTML entities the service puts in question and answer text.
pub fn decode_html(text: &str) -> String
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char>
{
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).filter(|ch| *ch == '\t' || !ch.is_control());
    }

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "hellip" => '\u{2026}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "deg" => '\u{b0}',
        "pi" => '\u{3c0}',
        "shy" => '\u{ad}',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "Aacute" => 'Á',
        "Eacute" => 'É',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Uacute" => 'Ú',
        "agrave" => 'à',
        "egrave" => 'è',
        "ograve" => 'ò',
        "acirc" => 'â',
        "ecirc" => 'ê',
        "ocirc" => 'ô',
        "auml" => 'ä',
        "euml" => 'ë',
        "ouml" => 'ö',
        "uuml" => 'ü',
        "Auml" => 'Ä',
        "Ouml" => 'Ö',
        "Uuml" => 'Ü',
        "ntilde" => 'ñ',
        "Ntilde" => 'Ñ',
        "ccedil" => 'ç',
        "aring" => 'å',
        "oslash" => 'ø',
        "szlig" => 'ß',
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn decodes_common_entities()
    {
        assert_eq!(
            decode_html("Which &quot;Star Wars&quot; character&#039;s line is this?"),
            "Which \"Star Wars\" character's line is this?"
        );
        assert_eq!(decode_html("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_html("Pok&eacute;mon"), "Pokémon");
        assert_eq!(decode_html("&#x41;&#66;C"), "ABC");
    }

    #[test]
    fn control_code_points_stay_encoded()
    {
        assert_eq!(decode_html("a&#0;b"), "a&#0;b");
        assert_eq!(decode_html("&#x1b;[2J"), "&#x1b;[2J");
        assert_eq!(decode_html("&#127;"), "&#127;");
        assert_eq!(decode_html("a&#9;b"), "a\tb");
    }

    #[test]
    fn leaves_stray_ampersands_alone()
    {
        assert_eq!(decode_html("R&D"), "R&D");
        assert_eq!(decode_html("a & b; c"), "a & b; c");
        assert_eq!(decode_html("&bogus;"), "&bogus;");
        assert_eq!(decode_html("ends with &"), "ends with &");
    }

    #[test]
    fn request_path_includes_optional_filters()
    {
        let plain = QuizRequest {
            amount: 10,
            category: None,
            difficulty: None,
        };
        assert_eq!(plain.query_path(), "/api.php?amount=10&type=multiple");

        let filtered = QuizRequest {
            amount: 500,
            category: Some(18),
            difficulty: Some(Difficulty::Hard),
        };
        assert_eq!(
            filtered.query_path(),
            "/api.php?amount=50&category=18&difficulty=hard&type=multiple"
        );
    }

    #[test]
    fn parses_a_question_response()
    {
        let json = r#"{
            "response_code": 0,
            "results": [{
                "type": "multiple",
                "difficulty": "easy",
                "category": "Science &amp; Nature",
                "question": "What is the chemical symbol for &quot;gold&quot;?",
                "correct_answer": "Au",
                "incorrect_answers": ["Ag", "Gd", "Go"]
            }]
        }"#;
        let resp: QuestionResponse = serde_json::from_str(json).unwrap();
        let questions = questions_from_response(resp).unwrap();

        assert_eq!(questions.len(), 1);
        let question = &questions[0];
        assert_eq!(question.prompt, "What is the chemical symbol for \"gold\"?");
        assert_eq!(question.correct_answer, "Au");
        assert_eq!(question.distractors, vec!["Ag", "Gd", "Go"]);
        assert_eq!(question.category.as_deref(), Some("Science & Nature"));
        assert_eq!(question.difficulty.as_deref(), Some("easy"));
        assert!(question.check().is_ok());
    }

    #[test]
    fn service_codes_become_errors()
    {
        let code = |n: u32| {
            let json = format!(r#"{{"response_code": {n}, "results": []}}"#);
            questions_from_response(serde_json::from_str(&json).unwrap())
        };
        assert!(matches!(code(1), Err(TriviaError::NoResults)));
        assert!(matches!(code(2), Err(TriviaError::InvalidParameter)));
        assert!(matches!(code(5), Err(TriviaError::RateLimited)));
        assert!(matches!(code(4), Err(TriviaError::Service(4))));
        assert!(matches!(code(0), Ok(list) if list.is_empty()));
    }

    #[test]
    fn parses_categories()
    {
        let json = r#"{"trivia_categories":[{"id":9,"name":"General Knowledge"},{"id":18,"name":"Science: Computers"}]}"#;
        let resp: CategoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.trivia_categories,
            vec![
                Category {
                    id: 9,
                    name: "General Knowledge".to_string()
                },
                Category {
                    id: 18,
                    name: "Science: Computers".to_string()
                },
            ]
        );
    }

    #[test]
    fn difficulty_parsing()
    {
        assert_eq!(Difficulty::parse("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse(" easy "), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse("any"), None);
    }
}
