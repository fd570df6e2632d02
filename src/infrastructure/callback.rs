//! 本地 OAuth 回调服务
//!
//! 在回调地址上临时启动一个 axum 服务，收到第一次回调后立即关闭

use std::sync::Arc;

use axum::{extract::Query, extract::State, routing::get, Router};
use serde::Deserialize;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};
use url::Url;

use crate::error::AuthError;

/// 回调查询参数
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// 校验回调参数，返回授权码
pub fn validate_callback(params: CallbackParams, expected_state: &str) -> Result<String, AuthError> {
    if let Some(reason) = params.error {
        return Err(AuthError::Denied { reason });
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::MissingCode)
}

/// 等待浏览器回调
///
/// # 参数
/// - `redirect_uri`: 注册的回调地址，决定监听的 host:port 和路径
/// - `expected_state`: 授权链接中使用的 state
///
/// # 返回
/// 校验通过的授权码
pub async fn wait_for_code(redirect_uri: &Url, expected_state: &str) -> Result<String, AuthError> {
    let host = redirect_uri.host_str().unwrap_or("localhost");
    let port = redirect_uri.port_or_known_default().unwrap_or(80);
    let addr = format!("{}:{}", host, port);
    let path = match redirect_uri.path() {
        "" => "/".to_string(),
        p => p.to_string(),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| AuthError::Listener {
            addr: addr.clone(),
            source,
        })?;

    let (tx, rx) = oneshot::channel::<CallbackParams>();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let sender: CallbackSender = Arc::new(Mutex::new(Some(tx)));

    let app = Router::new()
        .route(&path, get(handle_callback))
        .with_state(sender);

    info!("⏳ 等待授权回调: http://{}{}", addr, path);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let params = rx.await.map_err(|_| AuthError::CallbackClosed);
    let _ = shutdown_tx.send(());
    if let Ok(Err(e)) = server.await {
        warn!("回调服务退出异常: {}", e);
    }

    validate_callback(params?, expected_state)
}

async fn handle_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> &'static str {
    let denied = params.error.is_some();
    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(params);
    }
    if denied {
        "Authorization was denied. You can close this window."
    } else {
        "Authentication complete. You can close this window."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(code: Option<&str>, state: Option<&str>, error: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_valid_callback() {
        let code = validate_callback(params(Some("4/abc"), Some("s1"), None), "s1").unwrap();
        assert_eq!(code, "4/abc");
    }

    #[test]
    fn test_state_mismatch() {
        let err = validate_callback(params(Some("4/abc"), Some("other"), None), "s1").unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[test]
    fn test_denied() {
        let err = validate_callback(params(None, Some("s1"), Some("access_denied")), "s1").unwrap_err();
        assert!(matches!(err, AuthError::Denied { ref reason } if reason == "access_denied"));
    }

    #[test]
    fn test_missing_code() {
        let err = validate_callback(params(Some(""), Some("s1"), None), "s1").unwrap_err();
        assert!(matches!(err, AuthError::MissingCode));
    }

    #[tokio::test]
    async fn test_wait_for_code_receives_callback() {
        // 先占用一个空闲端口再释放，拿到可用的端口号
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let redirect = Url::parse(&format!("http://127.0.0.1:{}/callback", port)).unwrap();

        let waiter = tokio::spawn({
            let redirect = redirect.clone();
            async move { wait_for_code(&redirect, "xyz").await }
        });

        // 等服务启动
        let client = reqwest::Client::new();
        let url = format!("{}?code=4%2Fabc&state=xyz", redirect);
        let mut sent = false;
        for _ in 0..50 {
            if client.get(&url).send().await.is_ok() {
                sent = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(sent);

        let code = waiter.await.unwrap().unwrap();
        assert_eq!(code, "4/abc");
    }
}
