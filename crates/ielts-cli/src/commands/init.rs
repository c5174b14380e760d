//! The `ielts init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("ielts.toml").exists() {
        println!("ielts.toml already exists, skipping.");
    } else {
        std::fs::write("ielts.toml", SAMPLE_CONFIG)?;
        println!("Created ielts.toml");
    }

    std::fs::create_dir_all("tests")?;
    let sample_path = Path::new("tests/sample-listening.json");
    if sample_path.exists() {
        println!("tests/sample-listening.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_TEST)?;
        println!("Created tests/sample-listening.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: ielts validate --tests tests/sample-listening.json");
    println!("  2. Run: ielts session status --test tests/sample-listening.json --module listening");
    println!("  3. Answer with: ielts session answer --test tests/sample-listening.json --module listening --key 1 --value library");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# ielts-practice configuration

# Where session state is kept between commands
storage_dir = "./.ielts-state"
storage_prefix = "ielts"

# Module used when --module is not given
default_module = "reading"

# Where submitted attempts are saved
results_dir = "./ielts-results"
"#;

const SAMPLE_TEST: &str = r#"{
  "id": "sample-listening",
  "title": "Sample Listening Test",
  "timeLimitSeconds": 1800,
  "sections": [
    {
      "id": "p1",
      "title": "Part 1",
      "questions": [
        { "key": 1, "type": "text", "prompt": "Where will the group meet?" },
        { "key": 2, "type": "single_letter", "prompt": "Which day is chosen?" },
        { "key": 3, "type": "tfng", "prompt": "The tour includes lunch." }
      ]
    },
    {
      "id": "p2",
      "title": "Part 2",
      "questions": [
        { "key": 4, "type": "multipleChoice", "prompt": "Choose TWO facilities." },
        { "key": 5, "type": "multi_letter", "groupId": "5-6" },
        { "key": 6, "type": "multi_letter", "groupId": "5-6" }
      ]
    }
  ],
  "answerKey": {
    "1": { "type": "text", "accepted": ["library", "the library"] },
    "2": { "type": "single_letter", "accepted": "B" },
    "3": { "type": "tfng", "accepted": "NOT GIVEN" },
    "4": { "type": "multipleChoice", "accepted": ["A", "D"] }
  },
  "answerGroups": [
    { "id": "5-6", "keys": ["5", "6"], "acceptedSet": ["B", "E"], "expectedCount": 2 }
  ]
}
"#;
