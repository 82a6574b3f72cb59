#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use hix_admin::auth::{Claims, JwtKeys};
use hix_admin::tenant::TenantId;

pub const JWT_SECRET: &str = "hix-integration-secret";

/// A `hix-admin` process on its own port, backed by a file route store.
/// Killed when dropped.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub route_file: PathBuf,
    child: Child,
}

impl TestServer {
    fn spawn(route_file: &Path) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hix-admin"));
        cmd.env("APP_ENV", "development")
            .env("HIX_API_PORT", port.to_string())
            .env("GATEWAY_ROUTE_STORE", "file")
            .env("GATEWAY_ROUTE_FILE", route_file)
            .env("DATABASE_MENU_IN_POSTGRES", "false")
            .env("JWT_SECRET", JWT_SECRET)
            .env("RUST_LOG", "hix_admin=warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn hix-admin binary")?;

        Ok(Self {
            port,
            base_url,
            route_file: route_file.to_path_buf(),
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Start a server whose routes live in `route_file`
pub async fn start_server(route_file: &Path) -> Result<TestServer> {
    let server = TestServer::spawn(route_file)?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Bearer token for `tenant` with roles and permissions
pub fn token(tenant: i32, roles: Vec<i32>, permissions: &[&str]) -> String {
    let claims = Claims::new(
        "admin",
        1,
        TenantId(tenant),
        roles,
        permissions.iter().map(|p| p.to_string()).collect(),
        1,
    );
    JwtKeys::new(JWT_SECRET, 1).generate(&claims).expect("token")
}

/// Token holding every administrative permission
pub fn admin_token(tenant: i32) -> String {
    token(
        tenant,
        vec![1],
        &["sys_menu_add", "sys_menu_edit", "sys_menu_del", "sys_role_perm"],
    )
}

/// Client that always sends the tenant header and bearer token
pub fn client_for(tenant: i32, token: &str) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    // Header names are case-insensitive; static names must be lowercase
    headers.insert("tenantid", tenant.to_string().parse()?);
    headers.insert(reqwest::header::AUTHORIZATION, format!("Bearer {}", token).parse()?);
    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

pub async fn json_body(res: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let body = res.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}
