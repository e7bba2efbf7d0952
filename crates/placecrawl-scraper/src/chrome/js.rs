//! Page-side functions run through `Runtime.callFunctionOn`, plus the mapping
//! from CDP failures onto [`PortError`].

use chromiumoxide::error::CdpError;

use crate::error::PortError;

/// Browser user agents handed out round-robin by worker id.
pub(crate) const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36",
];

pub(crate) const ACCEPT_LANGUAGE: &str = "ko-KR,ko,en-US,en";

/// Remote objects handed out as element refs live in this group and are
/// released on every navigation.
pub(crate) const OBJECT_GROUP: &str = "placecrawl";

#[must_use]
pub(crate) fn user_agent_for(worker_id: usize) -> &'static str {
    USER_AGENTS[worker_id % USER_AGENTS.len()]
}

/// `(scope, strategy, value)` to the first match or `null`.
pub(crate) const FIND_ONE: &str = r"function(scope, strategy, value) {
    const root = scope || document;
    if (strategy === 'css') {
        return root.querySelector(value);
    }
    return document.evaluate(
        value, root, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null
    ).singleNodeValue;
}";

/// `(scope, strategy, value)` to an array of every match.
pub(crate) const FIND_ALL: &str = r"function(scope, strategy, value) {
    const root = scope || document;
    if (strategy === 'css') {
        return Array.from(root.querySelectorAll(value));
    }
    const found = document.evaluate(
        value, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null
    );
    const out = [];
    for (let i = 0; i < found.snapshotLength; i++) {
        out.push(found.snapshotItem(i));
    }
    return out;
}";

pub(crate) const CLICK: &str = r"function() {
    this.scrollIntoView({ block: 'center' });
    this.click();
}";

pub(crate) const TEXT: &str = r"function() {
    return (this.innerText || this.textContent || '').trim();
}";

pub(crate) const ATTRIBUTE: &str = r"function(name) {
    return this.getAttribute(name);
}";

/// Wrap a script body that reads `arguments[i]` into a callable declaration.
pub(crate) fn script_function(body: &str) -> String {
    format!("function() {{\n{body}\n}}")
}

/// Browser flags on top of chromiumoxide's defaults.
pub(crate) fn launch_args(no_sandbox: bool) -> Vec<String> {
    let mut args = vec![
        "--lang=ko-KR".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--window-size=1280,900".to_string(),
    ];
    if no_sandbox {
        args.push("--no-sandbox".to_string());
    }
    args
}

/// Chrome error text for an element or context that no longer exists.
fn is_missing_object(message: &str) -> bool {
    ["Could not find object", "No node", "Cannot find context", "No frame"]
        .iter()
        .any(|needle| message.contains(needle))
}

pub(crate) fn chrome_message_error(message: String) -> PortError {
    if is_missing_object(&message) {
        PortError::NotFound(message)
    } else {
        PortError::Protocol {
            code: "chrome".to_string(),
            message,
        }
    }
}

/// Map a CDP client failure onto the port's error taxonomy.
pub(crate) fn port_error(err: CdpError) -> PortError {
    match err {
        CdpError::Timeout => PortError::Timeout("browser response".to_string()),
        CdpError::NotFound | CdpError::FrameNotFound(_) => PortError::NotFound(err.to_string()),
        CdpError::Chrome(_) | CdpError::ChromeMessage(_) => chrome_message_error(err.to_string()),
        CdpError::JavascriptException(_) => PortError::Protocol {
            code: "javascript error".to_string(),
            message: err.to_string(),
        },
        CdpError::Ws(_)
        | CdpError::Io(_)
        | CdpError::NoResponse
        | CdpError::ChannelSendError(_)
        | CdpError::LaunchExit(..)
        | CdpError::LaunchTimeout(..)
        | CdpError::LaunchIo(..) => PortError::Transport(err.to_string()),
        other => PortError::Protocol {
            code: "cdp".to_string(),
            message: other.to_string(),
        },
    }
}
