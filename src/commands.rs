//! Command execution.

use crate::config::Config;
use crate::{Commands, KindArg};
use colored::Colorize;
use ocppmsg_messages::{Action, ActionVisitor};
use ocppmsg_protocol::{
    MessageKind, NetworkPath, Request, RequestId, RequestMeta, RequestPayload, Response,
    ResponseMeta, ResponsePayload, RpcFrame, SerializeOptions, SignKey,
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

type CommandResult = Result<String, Box<dyn std::error::Error>>;

/// Executes a command and returns the formatted output.
pub fn execute(config: &Config, cmd: Commands) -> CommandResult {
    match cmd {
        Commands::Actions => Ok(list_actions()),

        Commands::Parse {
            action,
            kind,
            request,
            context,
            json,
        } => {
            let message = Message::load(config, &action, kind, request.as_deref(), &json)?;
            let include_context = context || config.envelope.include_context;
            message.run(Operation::Normalize { include_context })
        }

        Commands::Frame { frame } => {
            let text = read_arg(&frame)?;
            let frame = RpcFrame::parse(&text)?;
            describe_frame(config, &frame)
        }

        Commands::Sign {
            action,
            kind,
            request,
            key_file,
            json,
        } => {
            let key = config.signing.load_key(key_file.as_deref())?;
            let message = Message::load(config, &action, kind, request.as_deref(), &json)?;
            message.run(Operation::Sign {
                key,
                include_context: config.envelope.include_context,
            })
        }

        Commands::Verify {
            action,
            kind,
            request,
            json,
        } => {
            let message = Message::load(config, &action, kind, request.as_deref(), &json)?;
            message.run(Operation::Verify)
        }

        Commands::PublicKey { key_file } => {
            let key = config.signing.load_key(key_file.as_deref())?;
            let key_id = key.key_id();
            let fingerprint = hex::encode(Sha256::digest(key_id.as_bytes()));
            Ok(format!(
                "{}: {}\n{}: {}",
                "Key id".bold(),
                key_id,
                "SHA-256 fingerprint".bold(),
                fingerprint
            ))
        }
    }
}

fn list_actions() -> String {
    let mut output = String::new();
    for action in Action::ALL {
        output.push_str(&format!(
            "{} (sent by {})\n  request:  {}\n  response: {}\n",
            action.as_str().cyan(),
            action.initiator(),
            action.context(MessageKind::Request),
            action.context(MessageKind::Response)
        ));
    }
    output
}

/// A message given on the command line, not yet bound to a payload type.
struct Message<'a> {
    config: &'a Config,
    action: Action,
    kind: MessageKind,
    json: Value,
    request: Option<Value>,
}

enum Operation {
    Normalize { include_context: bool },
    Sign { key: SignKey, include_context: bool },
    Verify,
}

impl<'a> Message<'a> {
    fn load(
        config: &'a Config,
        action: &str,
        kind: KindArg,
        request: Option<&str>,
        json: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let action: Action = action.parse()?;
        let kind = MessageKind::from(kind);
        let request = request.map(parse_json_arg).transpose()?;
        if kind == MessageKind::Response && request.is_none() {
            return Err("a response needs the request it answers (--request)".into());
        }
        Ok(Self {
            config,
            action,
            kind,
            json: parse_json_arg(json)?,
            request,
        })
    }

    fn meta(&self) -> Result<RequestMeta, Box<dyn std::error::Error>> {
        Ok(RequestMeta::new(RequestId::generate(), "local")
            .with_timeout(self.config.envelope.request_timeout())
            .with_serialization_format(self.config.envelope.serialization_format()?)
            .with_network_path(NetworkPath::from_hops(["local"])))
    }

    fn run(self, operation: Operation) -> CommandResult {
        let action = self.action;
        action.visit(Run {
            message: self,
            operation,
        })
    }
}

struct Run<'a> {
    message: Message<'a>,
    operation: Operation,
}

impl ActionVisitor for Run<'_> {
    type Output = CommandResult;

    fn visit<Q>(self) -> CommandResult
    where
        Q: RequestPayload,
        Q::Response: ResponsePayload<Request = Q>,
    {
        let Run { message, operation } = self;
        match message.kind {
            MessageKind::Request => {
                let request = Request::<Q>::parse(&message.json, message.meta()?, None)?;
                tracing::debug!(
                    action = %message.action,
                    hash = request.hash_code(),
                    "parsed request"
                );
                match operation {
                    Operation::Normalize { include_context } => {
                        Ok(format_json(&request.to_json_with(&options(include_context))))
                    }
                    Operation::Sign {
                        key,
                        include_context,
                    } => {
                        let signed = request.signed_by(&key);
                        Ok(format_json(&signed.to_json_with(&options(include_context))))
                    }
                    Operation::Verify => {
                        request.verify()?;
                        Ok(verified(request.signatures().len()))
                    }
                }
            }
            MessageKind::Response => {
                let request_json = message
                    .request
                    .as_ref()
                    .ok_or("a response needs the request it answers (--request)")?;
                let request = Arc::new(Request::<Q>::parse(request_json, message.meta()?, None)?);
                let response = Response::<Q::Response>::parse(
                    request.clone(),
                    &message.json,
                    ResponseMeta::for_request(&request),
                    None,
                )?;
                tracing::debug!(
                    action = %message.action,
                    hash = response.hash_code(),
                    "parsed response"
                );
                match operation {
                    Operation::Normalize { include_context } => {
                        Ok(format_json(&response.to_json_with(&options(include_context))))
                    }
                    Operation::Sign {
                        key,
                        include_context,
                    } => {
                        let signed = response.signed_by(&key);
                        Ok(format_json(&signed.to_json_with(&options(include_context))))
                    }
                    Operation::Verify => {
                        response.verify()?;
                        Ok(verified(response.signatures().len()))
                    }
                }
            }
        }
    }
}

fn options<'a, T>(include_context: bool) -> SerializeOptions<'a, T> {
    let options = SerializeOptions::new();
    if include_context {
        options.with_context()
    } else {
        options
    }
}

fn verified(count: usize) -> String {
    if count == 0 {
        "No signatures to verify".yellow().to_string()
    } else {
        format!("{} {} signature(s)", "Verified".green(), count)
    }
}

/// Summarizes a frame; CALL payloads are also checked against their action.
fn describe_frame(config: &Config, frame: &RpcFrame) -> CommandResult {
    let mut summary = json!({
        "type": frame.type_name(),
        "messageId": frame.message_id(),
    });
    match frame {
        RpcFrame::Call {
            action, payload, ..
        } => {
            summary["action"] = json!(action);
            let action: Action = action.parse()?;
            let message = Message {
                config,
                action,
                kind: MessageKind::Request,
                json: payload.clone(),
                request: None,
            };
            let normalized = message.run(Operation::Normalize {
                include_context: false,
            })?;
            summary["payload"] = serde_json::from_str(&normalized)?;
        }
        RpcFrame::CallResult { payload, .. } => {
            summary["payload"] = payload.clone();
        }
        RpcFrame::CallError {
            error_code,
            description,
            details,
            ..
        } => {
            summary["errorCode"] = json!(error_code.as_str());
            summary["retryable"] = json!(error_code.is_retryable());
            summary["description"] = json!(description);
            summary["details"] = details.clone();
        }
    }
    Ok(format_json(&summary))
}

/// Reads an argument given inline or as @file.
fn read_arg(arg: &str) -> Result<String, Box<dyn std::error::Error>> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(arg.to_string()),
    }
}

/// Parses a JSON argument (either inline JSON or @file.json).
fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::from_str(&read_arg(arg)?)?)
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn run(cmd: Commands) -> String {
        execute(&Config::default(), cmd).unwrap()
    }

    fn parse_cmd(action: &str, json: &str) -> Commands {
        Commands::Parse {
            action: action.to_string(),
            kind: KindArg::Request,
            request: None,
            context: false,
            json: json.to_string(),
        }
    }

    #[test]
    fn test_actions_lists_catalog() {
        let output = run(Commands::Actions);
        for action in Action::ALL {
            assert!(output.contains(action.as_str()));
        }
    }

    #[test]
    fn test_parse_normalizes() {
        let output = run(parse_cmd(
            "RequestStopTransaction",
            r#"{"customData": {"vendorId": "acme"}, "transactionId": "t-1"}"#,
        ));
        let value: Value = serde_json::from_str(&output).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["transactionId", "customData"]);
    }

    #[test]
    fn test_parse_reports_missing_field() {
        let err = execute(&Config::default(), parse_cmd("RequestStopTransaction", "{}")).unwrap_err();
        assert!(err.to_string().contains("transactionId"));
    }

    #[test]
    fn test_unknown_action() {
        let err = execute(&Config::default(), parse_cmd("Heartbeat", "{}")).unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }

    #[test]
    fn test_response_requires_request() {
        let cmd = Commands::Parse {
            action: "MeterValues".to_string(),
            kind: KindArg::Response,
            request: None,
            context: false,
            json: "{}".to_string(),
        };
        assert!(execute(&Config::default(), cmd).is_err());
    }

    #[test]
    fn test_parse_response_with_context() {
        let cmd = Commands::Parse {
            action: "GetTransactionStatus".to_string(),
            kind: KindArg::Response,
            request: Some("{}".to_string()),
            context: true,
            json: r#"{"messagesInQueue": true}"#.to_string(),
        };
        let value: Value = serde_json::from_str(&run(cmd)).unwrap();
        assert_eq!(
            value["@context"],
            "https://open.charging.cloud/context/ocpp/csms/getTransactionStatusResponse"
        );
        assert_eq!(value["messagesInQueue"], true);
    }

    #[test]
    fn test_sign_then_verify() {
        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(key_file, "{}", "2a".repeat(32)).unwrap();

        let signed = run(Commands::Sign {
            action: "NotifyQRCodeScanned".to_string(),
            kind: KindArg::Request,
            request: None,
            key_file: Some(key_file.path().to_path_buf()),
            json: r#"{"evseId": 1, "timeout": 30}"#.to_string(),
        });
        let value: Value = serde_json::from_str(&signed).unwrap();
        assert_eq!(value["signatures"][0]["signingMethod"], "Ed25519");

        let output = run(Commands::Verify {
            action: "NotifyQRCodeScanned".to_string(),
            kind: KindArg::Request,
            request: None,
            json: signed.clone(),
        });
        assert!(output.contains("1 signature(s)"));

        let tampered = signed.replace("\"timeout\": 30", "\"timeout\": 31");
        let err = execute(
            &Config::default(),
            Commands::Verify {
                action: "NotifyQRCodeScanned".to_string(),
                kind: KindArg::Request,
                request: None,
                json: tampered,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_frame_call() {
        let output = run(Commands::Frame {
            frame: r#"[2, "m-1", "RequestStopTransaction", {"transactionId": "t-1"}]"#.to_string(),
        });
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["type"], "CALL");
        assert_eq!(value["payload"]["transactionId"], "t-1");
    }

    #[test]
    fn test_frame_call_error() {
        let output = run(Commands::Frame {
            frame: r#"[4, "m-1", "InternalError", "boom", {}]"#.to_string(),
        });
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["errorCode"], "InternalError");
        assert_eq!(value["retryable"], true);
    }

    #[test]
    fn test_public_key() {
        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(key_file, "{}", "01".repeat(32)).unwrap();
        let output = run(Commands::PublicKey {
            key_file: Some(key_file.path().to_path_buf()),
        });
        assert!(output.contains(&SignKey::from_seed([1u8; 32]).key_id()));
    }
}
