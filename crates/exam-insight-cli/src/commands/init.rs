//! The `exam-insight init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("exam-insight.toml").exists() {
        println!("exam-insight.toml already exists, skipping.");
    } else {
        std::fs::write("exam-insight.toml", SAMPLE_CONFIG)?;
        println!("Created exam-insight.toml");
    }

    std::fs::create_dir_all("requests")?;
    let example_path = std::path::Path::new("requests/example.json");
    if example_path.exists() {
        println!("requests/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_REQUEST)?;
        println!("Created requests/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Set GEMINI_API_KEY or edit exam-insight.toml");
    println!("  2. Run: exam-insight validate --request requests/example.json");
    println!("  3. Run: exam-insight analyze --request requests/example.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# exam-insight configuration

default_provider = "gemini"
default_model = "gemini-1.5-pro"
default_temperature = 0.7
max_tokens = 1024
timeout_secs = 60
parallelism = 4
store_path = "./exam-insight-data/analyses.jsonl"

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

# Canned replies, no network. Use with --provider mock.
[providers.mock]
type = "mock"
"#;

const EXAMPLE_REQUEST: &str = r#"{
  "examContent": "Math Midterm Exam",
  "subject": "Mathematics",
  "language": "en",
  "score": 6.0,
  "time": 3600,
  "workingTime": 3000,
  "rating": "average",
  "totalQuestions": 5,
  "emptyAnswers": 1,
  "correctAnswers": 3,
  "wrongAnswers": 1,
  "questionLabels": [
    { "questionNumber": 1, "label": "algebra", "isCorrect": true },
    { "questionNumber": 2, "label": "algebra", "isCorrect": true },
    { "questionNumber": 3, "label": "geometry", "isCorrect": false },
    { "questionNumber": 4, "label": "geometry", "isCorrect": false },
    { "questionNumber": 5, "label": "probability", "isCorrect": true }
  ]
}
"#;
