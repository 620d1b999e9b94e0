//! Initialize a new crmsync project

use anyhow::Result;
use crmsync_core::config::CONFIG_FILE;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# crmsync configuration
pipedrive:
  # Read from the environment at load time
  api_token: "{{ env_var('PIPEDRIVE_API_TOKEN', '') }}"
  company_domain: "{{ env_var('PIPEDRIVE_COMPANY_DOMAIN', 'example') }}"
  timeout_secs: 30

# Pipedrive person field <- path into the input record
mapping:
  - pipedrive_key: name
    input_key: fullName
  - pipedrive_key: email
    input_key: contact.email
  - pipedrive_key: phone
    input_key: contact.phones[0]

input: data/person.json
"#;

const SAMPLE_PERSON: &str = r#"{
  "fullName": "Jane Doe",
  "contact": {
    "email": "jane@example.com",
    "phones": ["+1 555 0100"]
  }
}
"#;

const GITIGNORE: &str = r#"# Local input records
data/

# IDE
.idea/
.vscode/
*.swp
"#;

/// Run the init command
pub async fn run(path: &str) -> Result<()> {
    let project_dir = Path::new(path);

    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE
        );
    }

    fs::write(project_dir.join(CONFIG_FILE), CONFIG_TEMPLATE)?;

    fs::create_dir_all(project_dir.join("data"))?;
    fs::write(project_dir.join("data/person.json"), SAMPLE_PERSON)?;

    fs::write(project_dir.join(".gitignore"), GITIGNORE)?;

    tracing::info!("✓ Created crmsync project at {}", abs_path.display());
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  export PIPEDRIVE_API_TOKEN=...");
    tracing::info!("  crmsync preview     # Show the payload");
    tracing::info!("  crmsync sync        # Push it to Pipedrive");

    Ok(())
}
