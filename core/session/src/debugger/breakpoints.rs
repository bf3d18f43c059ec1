//! Breakpoint commands and resolution routing.

use inspector_protocol::{
    BreakpointId, ScriptId,
    debugger::{
        GetPossibleBreakpoints, LocationPayload, RemoveBreakpoint, SetBreakpoint, SetBreakpointByUrl,
    },
    send,
};
use percent_encoding::percent_decode_str;

use super::DebuggerSession;
use crate::{
    events::ListenerId,
    location::{BreakLocation, Location},
};

/// Error text of backends that cannot set breakpoints by script hash.
const URL_OR_REGEX_REQUIRED: &str = "Either url or urlRegex must be specified.";

/// Outcome of setting a breakpoint.
///
/// A refused breakpoint has no id and no locations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetBreakpointResult {
    /// Backend id of the breakpoint.
    pub breakpoint_id: Option<BreakpointId>,
    /// Locations the breakpoint resolved to so far.
    pub locations: Vec<Location>,
}

impl DebuggerSession {
    /// Sets a breakpoint in every script loaded from `url`.
    ///
    /// The column is raised to the smallest column offset of the scripts of
    /// `url` starting on `line_number`. `file://` URLs match both the URL and
    /// the platform path.
    pub async fn set_breakpoint_by_url(
        &self,
        url: &str,
        line_number: u32,
        column_number: Option<u32>,
        condition: Option<String>,
    ) -> SetBreakpointResult {
        let url_regex = file_url_regex(url, self.config.borrow().windows_paths);
        let min_column_number = self
            .scripts
            .borrow()
            .min_column_for_line(url, line_number);
        let column_number = column_number.unwrap_or(0).max(min_column_number);

        let response = send(
            &*self.transport,
            &SetBreakpointByUrl {
                line_number,
                url: url_regex.is_none().then(|| url.to_owned()),
                url_regex,
                script_hash: None,
                column_number: Some(column_number),
                condition,
            },
        )
        .await;
        match response {
            Ok(response) => SetBreakpointResult {
                breakpoint_id: Some(response.breakpoint_id),
                locations: response.locations.iter().map(Location::from_payload).collect(),
            },
            Err(err) => {
                log::debug!("setBreakpointByUrl {url}:{line_number} failed: {err}");
                SetBreakpointResult::default()
            }
        }
    }

    /// Sets a breakpoint in an anonymous script, identified by its hash.
    ///
    /// Backends without hash support are retried through the script id.
    pub async fn set_breakpoint_in_anonymous_script(
        &self,
        script_id: &ScriptId,
        script_hash: &str,
        line_number: u32,
        column_number: Option<u32>,
        condition: Option<String>,
    ) -> SetBreakpointResult {
        let response = send(
            &*self.transport,
            &SetBreakpointByUrl {
                line_number,
                script_hash: Some(script_hash.to_owned()),
                column_number,
                condition: condition.clone(),
                ..SetBreakpointByUrl::default()
            },
        )
        .await;
        match response {
            Ok(response) => SetBreakpointResult {
                breakpoint_id: Some(response.breakpoint_id),
                locations: response.locations.iter().map(Location::from_payload).collect(),
            },
            Err(err) if err.remote_message() == Some(URL_OR_REGEX_REQUIRED) => {
                self.set_breakpoint_by_source_id(script_id, line_number, column_number, condition)
                    .await
            }
            Err(err) => {
                log::debug!("setBreakpointByUrl for script {script_id} failed: {err}");
                SetBreakpointResult::default()
            }
        }
    }

    /// Sets a breakpoint at a location of a single script.
    pub async fn set_breakpoint_by_source_id(
        &self,
        script_id: &ScriptId,
        line_number: u32,
        column_number: Option<u32>,
        condition: Option<String>,
    ) -> SetBreakpointResult {
        let response = send(
            &*self.transport,
            &SetBreakpoint {
                location: LocationPayload {
                    script_id: script_id.clone(),
                    line_number,
                    column_number,
                },
                condition,
            },
        )
        .await;
        match response {
            Ok(response) => SetBreakpointResult {
                breakpoint_id: Some(response.breakpoint_id),
                locations: vec![Location::from_payload(&response.actual_location)],
            },
            Err(err) => {
                log::debug!("setBreakpoint in script {script_id} failed: {err}");
                SetBreakpointResult::default()
            }
        }
    }

    /// Removes a breakpoint. Failures are logged only.
    pub async fn remove_breakpoint(&self, breakpoint_id: &BreakpointId) {
        let response = send(
            &*self.transport,
            &RemoveBreakpoint {
                breakpoint_id: breakpoint_id.clone(),
            },
        )
        .await;
        if let Err(err) = response {
            log::error!("Failed to remove breakpoint: {err}");
        }
    }

    /// Locations between `start` and `end` where a breakpoint could be set.
    pub async fn get_possible_breakpoints(
        &self,
        start: &Location,
        end: Option<&Location>,
        restrict_to_function: bool,
    ) -> Vec<BreakLocation> {
        let response = send(
            &*self.transport,
            &GetPossibleBreakpoints {
                start: start.payload(),
                end: end.map(Location::payload),
                restrict_to_function,
            },
        )
        .await;
        match response {
            Ok(response) => response
                .locations
                .into_iter()
                .map(BreakLocation::from_payload)
                .collect(),
            Err(err) => {
                log::debug!("getPossibleBreakpoints failed: {err}");
                Vec::new()
            }
        }
    }

    /// Handles `Debugger.breakpointResolved`.
    pub fn breakpoint_resolved(&self, breakpoint_id: &BreakpointId, location: &LocationPayload) {
        self.breakpoint_events
            .dispatch(breakpoint_id, &Location::from_payload(location));
    }

    /// Listens for resolutions of one breakpoint.
    pub fn add_breakpoint_listener(
        &self,
        breakpoint_id: &BreakpointId,
        listener: impl Fn(&Location) + 'static,
    ) -> ListenerId {
        self.breakpoint_events.add_listener(breakpoint_id, listener)
    }

    /// Stops listening for resolutions of one breakpoint.
    pub fn remove_breakpoint_listener(&self, breakpoint_id: &BreakpointId, id: ListenerId) -> bool {
        self.breakpoint_events.remove_listener(breakpoint_id, id)
    }
}

/// Builds the `urlRegex` matching a `file://` URL and its platform path.
///
/// Returns `None` for other URLs. On Windows the drive letter matches in
/// either case.
fn file_url_regex(url: &str, windows: bool) -> Option<String> {
    let decoded = percent_decode_str(url).decode_utf8_lossy();
    let platform_path = if windows {
        decoded.strip_prefix("file:///")?.replace('/', "\\")
    } else {
        decoded.strip_prefix("file://")?.to_owned()
    };
    let regex = format!("{}|{}", regex::escape(&platform_path), regex::escape(url));

    let mut chars = platform_path.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(drive), Some(':'), Some('\\')) if windows && drive.is_ascii_alphabetic() => Some(format!(
            "[{}{}]{}",
            drive.to_ascii_uppercase(),
            drive.to_ascii_lowercase(),
            &regex[1..]
        )),
        _ => Some(regex),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("https://example.com/app.js", false ; "http")]
    #[test_case("app.js", true ; "relative")]
    #[test_case("", false ; "empty")]
    fn non_file_urls_have_no_regex(url: &str, windows: bool) {
        assert_eq!(file_url_regex(url, windows), None);
    }

    #[test]
    fn posix_paths_are_decoded_and_escaped() {
        assert_eq!(
            file_url_regex("file:///home/dev/my%20app/index.js", false).as_deref(),
            Some(r"/home/dev/my app/index\.js|file:///home/dev/my%20app/index\.js")
        );
    }

    #[test]
    fn windows_drive_letter_matches_either_case() {
        assert_eq!(
            file_url_regex("file:///c:/src/app.js", true).as_deref(),
            Some(r"[Cc]:\\src\\app\.js|file:///c:/src/app\.js")
        );
    }

    #[test]
    fn windows_paths_without_drive_keep_their_first_character() {
        assert_eq!(
            file_url_regex("file:///share/app.js", true).as_deref(),
            Some(r"share\\app\.js|file:///share/app\.js")
        );
    }
}
