use crate::cli::OutputFormat;
use crate::commands::CommandResult;
use crate::error::CliError;

pub fn render(result: &CommandResult, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result.data)?);
        }
        OutputFormat::Text => {
            for line in &result.lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}
