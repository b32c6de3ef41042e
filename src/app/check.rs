//! The check flow: re-validate existing outputs without calling the backend.

use super::Project;
use super::reporter::Reporter;
use crate::checks::CheckOptions;
use crate::errors::RunError;

/// Validate every planned output against its source.
///
/// A missing output or the first rejected output ends the run. Returns the number of
/// outputs validated.
pub async fn check(
    project: &Project,
    check_cmd: Option<&str>,
    reporter: &dyn Reporter,
) -> Result<usize, RunError> {
    let total = project.pairs().count();
    reporter.progress_start("Validating", total);
    let result = check_all(project, check_cmd, reporter).await;
    reporter.progress_done();
    result
}

async fn check_all(
    project: &Project,
    check_cmd: Option<&str>,
    reporter: &dyn Reporter,
) -> Result<usize, RunError> {
    let mut checked = 0;
    for source in &project.plan.sources {
        let source_text =
            std::fs::read_to_string(&source.abs_path).map_err(|e| RunError::Read {
                path: source.abs_path.clone(),
                source: e,
            })?;
        let options = CheckOptions::for_directive(&source.directive, check_cmd);

        for output in &source.outputs {
            let path = project.output_abs(output);
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(RunError::MissingOutput(output.output_path.clone()));
                }
                Err(source) => return Err(RunError::Read { path, source }),
            };

            let label = Project::label(source, output);
            reporter.progress_increment(&label.to_string());
            project
                .checker
                .validate(source.format, &contents, &source_text, &options)
                .await
                .map_err(|failure| RunError::CheckFailed {
                    output: output.output_path.clone(),
                    lang: output.lang.clone(),
                    failure,
                })?;
            checked += 1;
        }
    }
    Ok(checked)
}
