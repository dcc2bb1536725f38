//! The user lifecycle every VU runs once per iteration

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

use crate::metrics::Sample;

pub const GROUP_CREATE: &str = "1. Criar Usuário (POST)";
pub const GROUP_GET: &str = "2. Buscar Usuário Específico (GET)";
pub const GROUP_UPDATE: &str = "3. Atualizar Usuário (PUT)";
pub const GROUP_LIST: &str = "4. Listar Todos os Usuários (GET)";
pub const GROUP_DELETE: &str = "5. Deletar Usuário (DELETE)";
pub const GROUP_VERIFY_DELETED: &str = "6. Verificar Usuário Deletado (GET)";

/// Outcome of one request; both fields are `None` on transport failure
#[derive(Debug, Default)]
struct Reply {
    status: Option<StatusCode>,
    body: Option<Value>,
}

impl Reply {
    fn is(&self, status: StatusCode) -> bool {
        self.status == Some(status)
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get(key))
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }
}

pub struct Scenario {
    client: Client,
    base_url: String,
    run_tag: Option<String>,
    think_scale: f64,
    samples: mpsc::UnboundedSender<Sample>,
}

impl Scenario {
    pub fn new(
        client: Client,
        base_url: &str,
        run_tag: Option<String>,
        think_scale: f64,
        samples: mpsc::UnboundedSender<Sample>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            run_tag,
            think_scale,
            samples,
        }
    }

    pub fn user_name(vu: u32, iter: u64) -> String {
        format!("Test User VU={vu} IT={iter}")
    }

    pub fn updated_name(vu: u32, iter: u64) -> String {
        format!("Updated User VU={vu} IT={iter}")
    }

    pub fn email(&self, vu: u32, iter: u64) -> String {
        match &self.run_tag {
            Some(tag) => format!("{tag}.user.vu{vu}.iter{iter}@test.com"),
            None => format!("user.vu{vu}.iter{iter}@test.com"),
        }
    }

    fn users_url(&self) -> String {
        format!("{}/usuarios", self.base_url)
    }

    fn user_url(&self, id: u64) -> String {
        format!("{}/usuarios/{}", self.base_url, id)
    }

    /// Create, read, update, list, delete and verify the deletion of one user.
    ///
    /// `vu` is 1-based, `iter` counts this VU's iterations from 0.
    pub async fn iteration(&self, vu: u32, iter: u64) {
        let started = Instant::now();
        let name = Self::user_name(vu, iter);
        let email = self.email(vu, iter);

        let reply = self
            .send(
                self.client
                    .post(self.users_url())
                    .json(&json!({ "nome": name, "email": email })),
                StatusCode::CREATED,
            )
            .await;
        self.check(GROUP_CREATE, "POST /usuarios - status é 201", reply.is(StatusCode::CREATED));
        self.check(
            GROUP_CREATE,
            "POST /usuarios - corpo da resposta contém ID",
            reply.field("id").is_some_and(|id| !id.is_null()),
        );
        self.check(
            GROUP_CREATE,
            "POST /usuarios - nome correto",
            reply.str_field("nome") == Some(name.as_str()),
        );
        self.check(
            GROUP_CREATE,
            "POST /usuarios - email correto",
            reply.str_field("email") == Some(email.as_str()),
        );
        let user_id = if reply.is(StatusCode::CREATED) {
            reply.field("id").and_then(Value::as_u64)
        } else {
            None
        };
        self.think(1.0).await;

        if let Some(id) = user_id {
            let reply = self
                .send(self.client.get(self.user_url(id)), StatusCode::OK)
                .await;
            self.check(GROUP_GET, "GET /usuarios/{id} - status é 200", reply.is(StatusCode::OK));
            self.check(
                GROUP_GET,
                "GET /usuarios/{id} - ID correto",
                reply.field("id").and_then(Value::as_u64) == Some(id),
            );
            self.check(
                GROUP_GET,
                "GET /usuarios/{id} - nome correto",
                reply.str_field("nome") == Some(name.as_str()),
            );
            self.think(0.5).await;

            let updated_name = Self::updated_name(vu, iter);
            let reply = self
                .send(
                    self.client
                        .put(self.user_url(id))
                        .json(&json!({ "nome": updated_name, "email": email })),
                    StatusCode::OK,
                )
                .await;
            self.check(GROUP_UPDATE, "PUT /usuarios/{id} - status é 200", reply.is(StatusCode::OK));
            self.check(
                GROUP_UPDATE,
                "PUT /usuarios/{id} - nome foi atualizado",
                reply.str_field("nome") == Some(updated_name.as_str()),
            );
            self.check(
                GROUP_UPDATE,
                "PUT /usuarios/{id} - email mantido",
                reply.str_field("email") == Some(email.as_str()),
            );
            self.think(1.0).await;
        }

        let reply = self
            .send(self.client.get(self.users_url()), StatusCode::OK)
            .await;
        let is_array = reply.body.as_ref().is_some_and(Value::is_array);
        self.check(GROUP_LIST, "GET /usuarios - status é 200", reply.is(StatusCode::OK));
        self.check(GROUP_LIST, "GET /usuarios - resposta é um array", is_array);
        self.check(GROUP_LIST, "GET /usuarios - contém usuários", is_array);
        self.think(0.5).await;

        if let Some(id) = user_id {
            let reply = self
                .send(self.client.delete(self.user_url(id)), StatusCode::NO_CONTENT)
                .await;
            self.check(
                GROUP_DELETE,
                "DELETE /usuarios/{id} - status é 204",
                reply.is(StatusCode::NO_CONTENT),
            );
            self.think(1.0).await;

            let reply = self
                .send(self.client.get(self.user_url(id)), StatusCode::NOT_FOUND)
                .await;
            self.check(
                GROUP_VERIFY_DELETED,
                "GET /usuarios/{id} deletado - status é 404",
                reply.is(StatusCode::NOT_FOUND),
            );
            self.think(0.5).await;
        }

        self.emit(Sample::Iteration {
            duration: started.elapsed(),
        });
    }

    /// Sends `request`, timing it through the end of the body.
    async fn send(&self, request: RequestBuilder, expected: StatusCode) -> Reply {
        let started = Instant::now();
        let outcome = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        }
        .await;
        let duration = started.elapsed();

        match outcome {
            Ok((status, bytes)) => {
                self.emit(Sample::Request {
                    duration,
                    failed: status != expected,
                });
                Reply {
                    status: Some(status),
                    body: serde_json::from_slice(&bytes).ok(),
                }
            }
            Err(e) => {
                debug!(error = %e, "Request failed");
                self.emit(Sample::Request {
                    duration,
                    failed: true,
                });
                Reply::default()
            }
        }
    }

    fn check(&self, group: &'static str, name: &'static str, passed: bool) {
        self.emit(Sample::Check {
            group,
            name,
            passed,
        });
    }

    fn emit(&self, sample: Sample) {
        // Only fails once the collector is gone, at which point nobody reads samples
        let _ = self.samples.send(sample);
    }

    async fn think(&self, seconds: f64) {
        if self.think_scale > 0.0 {
            if let Ok(pause) = Duration::try_from_secs_f64(seconds * self.think_scale) {
                tokio::time::sleep(pause).await;
            }
        }
    }
}
