//! Print the OpenAPI document as JSON.

use std::io::Write;

use ed_queue::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let document = ApiDoc::openapi().to_pretty_json()?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{document}")?;
    Ok(())
}
