//! Interactive datasource and batch-kwargs selection helpers.

use crate::batch_kwargs::BatchKwargs;
use crate::cli::util::{cli_message, Prompt};
use crate::cli::CliError;
use crate::context::DataContext;

/// Resolves the datasource to work against.
///
/// With an explicit name, checks it exists. Otherwise: zero configured
/// datasources is a failure, one is picked silently, several are offered
/// as a numbered list. Returns `None` after printing an error message, so
/// callers only have to abort.
pub fn select_datasource(
    context: &dyn DataContext,
    prompt: &mut dyn Prompt,
    datasource_name: Option<&str>,
) -> Option<String> {
    let names = context.datasource_names();

    if let Some(requested) = datasource_name {
        if names.iter().any(|name| name == requested) {
            return Some(requested.to_string());
        }
        cli_message(&format!(
            "<red>Datasource {} could not be found in your project configuration.</red>",
            requested
        ));
        return None;
    }

    match names.len() {
        0 => {
            cli_message("<red>No datasources found in your project configuration.</red>");
            None
        }
        1 => Some(names[0].clone()),
        _ => Some(select_from_list(prompt, "Select a datasource", &names)),
    }
}

/// Resolves generator, asset, and batch kwargs, prompting for whatever is
/// missing.
///
/// Additional batch kwargs are folded into the result, consuming them.
///
/// # Errors
/// Returns an error when the datasource offers no assets, or when the
/// context cannot build batch kwargs for the selection.
pub fn get_batch_kwargs(
    context: &dyn DataContext,
    prompt: &mut dyn Prompt,
    datasource_name: &str,
    generator_name: Option<&str>,
    data_asset_name: Option<&str>,
    additional_batch_kwargs: Option<BatchKwargs>,
) -> Result<(String, String, BatchKwargs), CliError> {
    let generator_name = match generator_name {
        Some(name) => name.to_string(),
        None => {
            let generators = context.generator_names(datasource_name)?;
            match generators.len() {
                0 => {
                    return Err(CliError::NoDataAssets {
                        datasource: datasource_name.to_string(),
                    })
                }
                1 => generators[0].clone(),
                _ => select_from_list(prompt, "Select a batch kwargs generator", &generators),
            }
        }
    };

    let data_asset_name = match data_asset_name {
        Some(name) => name.to_string(),
        None => {
            let assets = context.list_asset_names(datasource_name, Some(&generator_name))?;
            if assets.is_empty() {
                cli_message(&format!(
                    "<red>No data assets found in datasource {}.</red>",
                    datasource_name
                ));
                return Err(CliError::NoDataAssets {
                    datasource: datasource_name.to_string(),
                });
            }
            select_from_list(prompt, "Which data would you like to use?", &assets)
        }
    };

    let mut batch_kwargs =
        context.build_batch_kwargs(datasource_name, Some(&generator_name), &data_asset_name)?;
    if let Some(additional) = additional_batch_kwargs {
        batch_kwargs.merge(additional);
    }

    Ok((generator_name, data_asset_name, batch_kwargs))
}

/// Offers a numbered list and loops until a valid selection is made.
fn select_from_list(prompt: &mut dyn Prompt, message: &str, options: &[String]) -> String {
    for (index, option) in options.iter().enumerate() {
        cli_message(&format!("    {}. {}", index + 1, option));
    }
    loop {
        let answer = prompt.ask(message, Some("1"));
        if let Ok(selection) = answer.trim().parse::<usize>() {
            if selection >= 1 && selection <= options.len() {
                return options[selection - 1].clone();
            }
        }
        cli_message(&format!(
            "<yellow>Please enter a number between 1 and {}.</yellow>",
            options.len()
        ));
    }
}
