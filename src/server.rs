//! Minimal JSON-over-HTTP front for one dashboard session.
//!
//! Endpoints:
//!   GET /api/health                     - liveness
//!   GET /api/options                    - control options and legend
//!   GET /api/charts                     - current chart set
//!   GET /api/set?param=alpha&value=0.05 - apply one control change
//!   GET /api/refresh                    - recompute every slot

use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use url::form_urlencoded;

use crate::algorithms::AlgorithmSet;
use crate::controller::{ApplyOutcome, Controller};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::selection::{Alpha, ArmOrder, DistributionId, ParamChange, Parameter};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: &'static str,
    pub body: Value,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self { status: "200 OK", body }
    }

    fn status_code(&self) -> u16 {
        self.status
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(500)
    }

    fn to_http(&self) -> String {
        let body = self.body.to_string();
        format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Content-Length: {}\r\n\r\n{}",
            self.status,
            body.len(),
            body
        )
    }
}

/// `?a=1&b=2` → [("a","1"), ("b","2")]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

pub fn options_json(algorithms: &AlgorithmSet) -> Value {
    json!({
        "distribution": DistributionId::ALL.iter()
            .map(|d| json!({"value": d.control_value(), "label": d.label()}))
            .collect::<Vec<_>>(),
        "arm_order": ArmOrder::ALL.iter()
            .map(|o| json!({"value": o.token(), "label": o.label()}))
            .collect::<Vec<_>>(),
        "alpha": Alpha::ALL.iter()
            .map(|a| json!({"value": a.control_value(), "label": a.control_value()}))
            .collect::<Vec<_>>(),
        "focal_algorithm": algorithms.iter()
            .map(|e| json!({"value": e.algorithm.id(), "label": e.algorithm.id(), "color": e.color}))
            .collect::<Vec<_>>(),
    })
}

fn charts_json(controller: &Controller) -> Value {
    serde_json::to_value(controller.snapshot()).unwrap_or(Value::Null)
}

/// Routes one request line (`GET /path?query HTTP/1.1`).
pub async fn handle_request(controller: &Controller, request_line: &str) -> Response {
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");
    if method != "GET" {
        return Response {
            status: "405 METHOD NOT ALLOWED",
            body: json!({"error": "only GET is supported"}),
        };
    }
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    match path {
        "/api/health" => Response::ok(json!({"status": "ok"})),
        "/api/options" => Response::ok(options_json(controller.pipeline().algorithms())),
        "/api/charts" => Response::ok(charts_json(controller)),
        "/api/refresh" => {
            controller.refresh().await;
            Response::ok(charts_json(controller))
        }
        "/api/set" => {
            let params = parse_query(query);
            let get = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
            let (param, value) = match (get("param"), get("value")) {
                (Some(p), Some(v)) => (p, v),
                _ => {
                    return Response {
                        status: "400 BAD REQUEST",
                        body: json!({"error": "expected ?param=<control>&value=<value>"}),
                    }
                }
            };
            let param = match Parameter::parse(&param) {
                Ok(p) => p,
                Err(err) => {
                    return Response {
                        status: "400 BAD REQUEST",
                        body: json!({"error": err.to_string()}),
                    }
                }
            };
            match controller.apply(ParamChange::new(param, value)).await {
                ApplyOutcome::Rejected(err) => Response {
                    status: "422 UNPROCESSABLE ENTITY",
                    body: json!({"error": err.to_string(), "charts": charts_json(controller)}),
                },
                _ => Response::ok(charts_json(controller)),
            }
        }
        _ => Response {
            status: "404 NOT FOUND",
            body: json!({"error": "not found"}),
        },
    }
}

async fn handle_connection(controller: Arc<Controller>, mut stream: TcpStream) -> Result<()> {
    let (reader, mut writer) = stream.split();
    let mut lines = BufReader::new(reader).lines();
    let request_line = match lines.next_line().await? {
        Some(line) => line,
        None => return Ok(()),
    };
    let response = handle_request(&controller, &request_line).await;
    log(
        Level::Debug,
        Domain::Server,
        "request",
        obj(&[
            ("request", v_str(&request_line)),
            ("status", json!(response.status_code())),
        ]),
    );
    writer.write_all(response.to_http().as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn serve(controller: Arc<Controller>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    log(
        Level::Info,
        Domain::Server,
        "listening",
        obj(&[("addr", v_str(&format!("http://127.0.0.1:{}", port)))]),
    );
    loop {
        let (stream, _) = match listener.accept().await {
            Ok(s) => s,
            Err(_) => continue,
        };
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(controller, stream).await {
                log(
                    Level::Warn,
                    Domain::Server,
                    "connection_error",
                    obj(&[("msg", v_str(&err.to_string()))]),
                );
            }
        });
    }
}
