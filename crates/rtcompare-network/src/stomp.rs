//! STOMP 1.2 프레임 코덱.
//!
//! 푸시 채널은 WebSocket 텍스트 메시지 위에 STOMP 프레임을 싣는다.
//! 필요한 명령(CONNECT/SUBSCRIBE/DISCONNECT 송신, CONNECTED/MESSAGE/ERROR/RECEIPT 수신)만 다룬다.

use rtcompare_core::error::CoreError;

/// 프레임 종료 문자
const NULL: char = '\0';

/// STOMP 명령
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompCommand {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            StompCommand::Connect => "CONNECT",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Disconnect => "DISCONNECT",
            StompCommand::Message => "MESSAGE",
            StompCommand::Receipt => "RECEIPT",
            StompCommand::Error => "ERROR",
        }
    }

    fn parse(line: &str) -> Option<Self> {
        match line {
            "CONNECT" | "STOMP" => Some(StompCommand::Connect),
            "CONNECTED" => Some(StompCommand::Connected),
            "SUBSCRIBE" => Some(StompCommand::Subscribe),
            "UNSUBSCRIBE" => Some(StompCommand::Unsubscribe),
            "DISCONNECT" => Some(StompCommand::Disconnect),
            "MESSAGE" => Some(StompCommand::Message),
            "RECEIPT" => Some(StompCommand::Receipt),
            "ERROR" => Some(StompCommand::Error),
            _ => None,
        }
    }

    /// CONNECT/CONNECTED 프레임은 헤더 이스케이프를 적용하지 않는다
    fn escapes_headers(&self) -> bool {
        !matches!(self, StompCommand::Connect | StompCommand::Connected)
    }
}

/// STOMP 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// 헤더 추가 (빌더)
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// 본문 설정 (빌더)
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// 헤더 조회: 중복 시 첫 값이 우선
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT 프레임
    pub fn connect(host: &str) -> Self {
        StompFrame::new(StompCommand::Connect)
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", "0,0")
    }

    /// SUBSCRIBE 프레임
    pub fn subscribe(id: &str, destination: &str) -> Self {
        StompFrame::new(StompCommand::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    /// DISCONNECT 프레임
    pub fn disconnect() -> Self {
        StompFrame::new(StompCommand::Disconnect)
    }

    /// 와이어 포맷으로 인코딩
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (key, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(key));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NULL);
        out
    }
}

/// WebSocket 텍스트 메시지 하나를 프레임 목록으로 해석
///
/// 하트비트(빈 줄)만 있는 메시지는 빈 목록을 반환한다.
pub fn parse_frames(text: &str) -> Result<Vec<StompFrame>, CoreError> {
    let mut frames = Vec::new();
    for chunk in text.split(NULL) {
        let chunk = chunk.trim_start_matches(|c: char| c == '\r' || c == '\n');
        if chunk.is_empty() {
            continue;
        }
        frames.push(parse_frame(chunk)?);
    }
    Ok(frames)
}

fn parse_frame(chunk: &str) -> Result<StompFrame, CoreError> {
    let (head, body) = match chunk.find("\n\n") {
        Some(idx) => (&chunk[..idx], &chunk[idx + 2..]),
        None => match chunk.find("\r\n\r\n") {
            Some(idx) => (&chunk[..idx], &chunk[idx + 4..]),
            None => (chunk, ""),
        },
    };

    let mut lines = head.lines();
    let command_line = lines.next().unwrap_or_default().trim_end_matches('\r');
    let command = StompCommand::parse(command_line)
        .ok_or_else(|| CoreError::Protocol(format!("알 수 없는 STOMP 명령: {command_line}")))?;

    let unescape = command.escapes_headers();
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| CoreError::Protocol(format!("잘못된 STOMP 헤더: {line}")))?;
        if unescape {
            headers.push((unescape_header(key)?, unescape_header(value)?));
        } else {
            headers.push((key.to_string(), value.to_string()));
        }
    }

    let mut frame = StompFrame {
        command,
        headers,
        body: body.to_string(),
    };

    if let Some(len) = frame
        .get_header("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        if len <= frame.body.len() && frame.body.is_char_boundary(len) {
            frame.body.truncate(len);
        }
    }

    Ok(frame)
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, CoreError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(CoreError::Protocol(format!(
                    "잘못된 STOMP 이스케이프: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_connect_frame() {
        let encoded = StompFrame::connect("localhost").encode();
        assert_eq!(
            encoded,
            "CONNECT\naccept-version:1.2\nhost:localhost\nheart-beat:0,0\n\n\0"
        );
    }

    #[test]
    fn encode_subscribe_frame() {
        let encoded = StompFrame::subscribe("sub-0", "/topic/notifications").encode();
        assert!(encoded.starts_with("SUBSCRIBE\n"));
        assert!(encoded.contains("destination:/topic/notifications\n"));
        assert!(encoded.ends_with("\n\n\0"));
    }

    #[test]
    fn parse_message_frame() {
        let text = "MESSAGE\ndestination:/topic/notifications\ncontent-type:application/json\nsubscription:sub-0\nmessage-id:abc-1\ncontent-length:17\n\n{\"id\":1,\"x\":\"y\"}\n\0";
        let frames = parse_frames(text).unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.command, StompCommand::Message);
        assert_eq!(frame.get_header("subscription"), Some("sub-0"));
        assert_eq!(frame.body, "{\"id\":1,\"x\":\"y\"}\n");
    }

    #[test]
    fn heartbeat_only_message_is_empty() {
        assert!(parse_frames("\n").unwrap().is_empty());
        assert!(parse_frames("\r\n\r\n").unwrap().is_empty());
    }

    #[test]
    fn connected_frame_keeps_raw_headers() {
        let frames = parse_frames("CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\0").unwrap();
        assert_eq!(frames[0].command, StompCommand::Connected);
        assert_eq!(frames[0].get_header("version"), Some("1.2"));
    }

    #[test]
    fn header_escapes_decode() {
        let frames = parse_frames("ERROR\nmessage:bad\\cframe\\nline\n\nbody\0").unwrap();
        assert_eq!(frames[0].get_header("message"), Some("bad:frame\nline"));
        assert_eq!(frames[0].body, "body");
    }

    #[test]
    fn unknown_command_is_protocol_error() {
        let result = parse_frames("BOGUS\n\n\0");
        assert!(matches!(result, Err(CoreError::Protocol(_))));
    }

    #[test]
    fn multiple_frames_in_one_message() {
        let text = "RECEIPT\nreceipt-id:1\n\n\0\nMESSAGE\nsubscription:sub-0\n\nhello\0";
        let frames = parse_frames(text).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].body, "hello");
    }
}
