//! [`AutomationPort`] over the Chrome DevTools Protocol, driving a local
//! Chrome/Chromium through `chromiumoxide`.
//!
//! Elements are remote object ids. The current frame is tracked here and
//! every lookup or script runs in that frame's main-world execution context,
//! so page globals stay visible to scripts.

mod js;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::DescribeNodeParams;
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::FrameId;
use chromiumoxide::cdp::js_protocol::runtime::{
    CallArgument, CallFunctionOnParams, CallFunctionOnReturns, ExecutionContextId,
    GetPropertiesParams, ReleaseObjectGroupParams, RemoteObjectId,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use placecrawl_core::AppConfig;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::PortError;
use crate::port::{AutomationPort, ElementRef, Frame, Locator, PortFactory};
use crate::retry::retry_with_backoff;
use js::port_error;

/// One live browser with a single page.
pub struct ChromePort {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    page: Page,
    /// `None` is the top-level document.
    frame: Mutex<Option<FrameId>>,
    profile_dir: PathBuf,
}

impl std::fmt::Debug for ChromePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromePort")
            .field("profile_dir", &self.profile_dir)
            .finish_non_exhaustive()
    }
}

impl ChromePort {
    async fn context(&self) -> Result<ExecutionContextId, PortError> {
        let frame = self.frame.lock().await.clone();
        let frame = match frame {
            Some(frame) => frame,
            None => self
                .page
                .mainframe()
                .await
                .map_err(port_error)?
                .ok_or_else(|| PortError::NotFound("main frame".to_string()))?,
        };
        self.page
            .frame_execution_context(frame.clone())
            .await
            .map_err(port_error)?
            .ok_or_else(|| PortError::NotFound(format!("execution context for frame {frame:?}")))
    }

    /// Call `declaration` in the current frame. With `this_object`, the
    /// function runs with that element as `this`.
    async fn call(
        &self,
        declaration: &str,
        this_object: Option<&ElementRef>,
        arguments: Vec<CallArgument>,
        return_by_value: bool,
    ) -> Result<CallFunctionOnReturns, PortError> {
        let mut builder = CallFunctionOnParams::builder()
            .function_declaration(declaration)
            .arguments(arguments)
            .return_by_value(return_by_value)
            .await_promise(true)
            .object_group(js::OBJECT_GROUP);
        builder = match this_object {
            Some(element) => builder.object_id(object_id(element)),
            None => builder.execution_context_id(self.context().await?),
        };
        let params = builder.build().map_err(|message| PortError::Protocol {
            code: "invalid command".to_string(),
            message,
        })?;

        let returns = self.page.execute(params).await.map_err(port_error)?.result;
        if let Some(details) = &returns.exception_details {
            let description = details
                .exception
                .as_ref()
                .and_then(|e| e.description.clone())
                .unwrap_or_else(|| details.text.clone());
            return Err(js::chrome_message_error(description));
        }
        Ok(returns)
    }

    async fn call_for_value(
        &self,
        declaration: &str,
        this_object: Option<&ElementRef>,
        arguments: Vec<CallArgument>,
    ) -> Result<Value, PortError> {
        let returns = self
            .call(declaration, this_object, arguments, true)
            .await?;
        Ok(returns.result.value.unwrap_or(Value::Null))
    }

    fn locator_arguments(locator: &Locator, scope: Option<&ElementRef>) -> Vec<CallArgument> {
        let scope = match scope {
            Some(element) => CallArgument::builder().object_id(object_id(element)).build(),
            None => CallArgument::builder().value(Value::Null).build(),
        };
        vec![
            scope,
            CallArgument::builder()
                .value(Value::from(locator.strategy()))
                .build(),
            CallArgument::builder()
                .value(Value::from(locator.value()))
                .build(),
        ]
    }
}

fn object_id(element: &ElementRef) -> RemoteObjectId {
    RemoteObjectId::new(element.id())
}

#[async_trait]
impl AutomationPort for ChromePort {
    async fn navigate(&self, url: &str) -> Result<(), PortError> {
        // Element refs from the previous document are dead after this.
        if let Err(e) = self
            .page
            .execute(ReleaseObjectGroupParams::new(js::OBJECT_GROUP))
            .await
        {
            tracing::debug!(error = %e, "could not release element handles");
        }
        self.page
            .goto(url)
            .await
            .map_err(port_error)?
            .wait_for_navigation()
            .await
            .map_err(port_error)?;
        *self.frame.lock().await = None;
        Ok(())
    }

    async fn switch_to_frame(&self, frame: Frame<'_>) -> Result<(), PortError> {
        let next = match frame {
            Frame::Default => None,
            Frame::Element(element) => {
                let node = self
                    .page
                    .execute(
                        DescribeNodeParams::builder()
                            .object_id(object_id(element))
                            .build(),
                    )
                    .await
                    .map_err(port_error)?
                    .result
                    .node;
                let frame_id = node.frame_id.ok_or_else(|| {
                    PortError::NotFound(format!("element {} is not a frame", element.id()))
                })?;
                Some(frame_id)
            }
        };
        *self.frame.lock().await = next;
        Ok(())
    }

    async fn find_element(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Option<ElementRef>, PortError> {
        let returns = self
            .call(
                js::FIND_ONE,
                None,
                Self::locator_arguments(locator, scope),
                false,
            )
            .await?;
        Ok(returns
            .result
            .object_id
            .map(|id| ElementRef::new(id.inner().clone())))
    }

    async fn find_elements(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>, PortError> {
        let returns = self
            .call(
                js::FIND_ALL,
                None,
                Self::locator_arguments(locator, scope),
                false,
            )
            .await?;
        let Some(array) = returns.result.object_id else {
            return Ok(Vec::new());
        };

        let properties = self
            .page
            .execute(
                GetPropertiesParams::builder()
                    .object_id(array)
                    .own_properties(true)
                    .build()
                    .map_err(|message| PortError::Protocol {
                        code: "invalid command".to_string(),
                        message,
                    })?,
            )
            .await
            .map_err(port_error)?
            .result
            .result;

        let mut indexed: Vec<(usize, ElementRef)> = properties
            .into_iter()
            .filter_map(|property| {
                let index = property.name.parse::<usize>().ok()?;
                let id = property.value?.object_id?;
                Some((index, ElementRef::new(id.inner().clone())))
            })
            .collect();
        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, element)| element).collect())
    }

    async fn click(&self, element: &ElementRef) -> Result<(), PortError> {
        self.call_for_value(js::CLICK, Some(element), Vec::new())
            .await?;
        Ok(())
    }

    async fn run_script(&self, script: &str, args: &[&ElementRef]) -> Result<Value, PortError> {
        let arguments = args
            .iter()
            .map(|element| CallArgument::builder().object_id(object_id(element)).build())
            .collect();
        self.call_for_value(&js::script_function(script), None, arguments)
            .await
    }

    async fn text(&self, element: &ElementRef) -> Result<String, PortError> {
        let value = self
            .call_for_value(js::TEXT, Some(element), Vec::new())
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, PortError> {
        let argument = CallArgument::builder().value(Value::from(name)).build();
        let value = self
            .call_for_value(js::ATTRIBUTE, Some(element), vec![argument])
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn close(&self) -> Result<(), PortError> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map_err(port_error);
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            tracing::debug!(
                path = %self.profile_dir.display(),
                error = %e,
                "could not remove browser profile"
            );
        }
        closed.map(|_| ())
    }
}

/// Launches one browser per crawl session.
#[derive(Debug, Clone)]
pub struct ChromeFactory {
    executable: Option<PathBuf>,
    headless: bool,
    no_sandbox: bool,
    request_timeout: Duration,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl ChromeFactory {
    #[must_use]
    pub fn new(
        executable: Option<PathBuf>,
        headless: bool,
        no_sandbox: bool,
        request_timeout: Duration,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Self {
        Self {
            executable,
            headless,
            no_sandbox,
            request_timeout,
            max_retries,
            backoff_base_secs,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.chrome_path.clone(),
            config.headless,
            config.chrome_no_sandbox,
            Duration::from_secs(config.request_timeout_secs),
            config.session_retries,
            config.session_backoff_base_secs,
        )
    }

    /// Each concurrent browser gets its own profile directory.
    fn profile_dir(worker_id: usize) -> PathBuf {
        std::env::temp_dir().join(format!(
            "placecrawl-{}-worker-{worker_id}",
            std::process::id()
        ))
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, PortError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .request_timeout(self.request_timeout)
            .args(js::launch_args(self.no_sandbox));
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(PortError::Transport)
    }

    async fn launch(&self, worker_id: usize) -> Result<ChromePort, PortError> {
        let profile_dir = Self::profile_dir(worker_id);
        let (browser, mut handler) = Browser::launch(self.browser_config(&profile_dir)?)
            .await
            .map_err(port_error)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            tracing::debug!(worker_id, "browser event loop exited");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(port_error(e));
            }
        };
        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(js::user_agent_for(worker_id))
            .accept_language(js::ACCEPT_LANGUAGE)
            .build()
            .map_err(|message| PortError::Protocol {
                code: "invalid command".to_string(),
                message,
            })?;
        page.execute(user_agent).await.map_err(port_error)?;

        Ok(ChromePort {
            browser: Mutex::new(browser),
            handler,
            page,
            frame: Mutex::new(None),
            profile_dir,
        })
    }
}

#[async_trait]
impl PortFactory for ChromeFactory {
    async fn open(&self, worker_id: usize) -> Result<Box<dyn AutomationPort>, PortError> {
        let port = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.launch(worker_id)
        })
        .await?;
        tracing::info!(worker_id, profile = %port.profile_dir.display(), "browser session opened");
        Ok(Box::new(port))
    }
}
