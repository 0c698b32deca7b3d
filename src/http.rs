//! 文本接口请求工具

use reqwest::StatusCode;
use std::time::Duration;

/// 单次请求的默认超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// 构建带超时的 HTTP 客户端
pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// GET 一个返回纯文本的接口
///
/// 仅当状态码为 200 且正文非空时返回 `Some`；其余情况（非 200、网络错误、
/// 超时、正文读取失败）记录日志后返回 `None`，不重试。
/// `label` 只用于日志，标明是哪一类请求。
pub async fn fetch_text(
    client: &reqwest::Client,
    endpoint: &str,
    query: &[(&str, &str)],
    label: &str,
) -> Option<String> {
    let mut request = client.get(endpoint);
    if !query.is_empty() {
        request = request.query(query);
    }

    let response = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            if e.is_timeout() {
                error!(target: "Http", "[{}] 请求超时: {}", label, e);
            } else {
                error!(target: "Http", "[{}] 请求异常: {}", label, e);
            }
            return None;
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        error!(target: "Http", "[{}] API请求失败，状态码: {}", label, status.as_u16());
        return None;
    }

    match response.text().await {
        Ok(body) if !body.is_empty() => {
            debug!(target: "Http", "[{}] 收到 {} 字节", label, body.len());
            Some(body)
        }
        Ok(_) => {
            warn!(target: "Http", "[{}] 接口返回了空内容", label);
            None
        }
        Err(e) => {
            error!(target: "Http", "[{}] 读取响应失败: {}", label, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn returns_body_on_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/text")
            .match_query(Matcher::UrlEncoded("k".into(), "v".into()))
            .with_status(200)
            .with_body("hello")
            .expect(1)
            .create_async()
            .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let url = format!("{}/text", server.url());
        let body = fetch_text(&client, &url, &[("k", "v")], "test").await;

        assert_eq!(body.as_deref(), Some("hello"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_ok_status_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/text")
            .with_status(404)
            .with_body("not here")
            .create_async()
            .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let url = format!("{}/text", server.url());

        assert!(fetch_text(&client, &url, &[], "test").await.is_none());
    }

    #[tokio::test]
    async fn empty_body_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/text")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let url = format!("{}/text", server.url());

        assert!(fetch_text(&client, &url, &[], "test").await.is_none());
    }

    #[tokio::test]
    async fn connection_refused_is_none() {
        // 绑定后立即释放，得到一个大概率无人监听的端口
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = build_client(Duration::from_secs(2)).unwrap();
        let url = format!("http://{}/text", addr);

        assert!(fetch_text(&client, &url, &[], "test").await.is_none());
    }
}
