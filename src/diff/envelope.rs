// Edit scripts and their CBOR envelope.
//
// Wire shape:
//
//   { "cmds": [ [0, start, end],   ; ORIG_BYTES: copy original[start..end]
//               [1, h'...'],       ; INSERT_BYTES: append literal bytes
//               ... ] }
//
// Other keys in the top-level map are ignored when decoding.

use ciborium::value::{Integer, Value};

/// Command code for a copy from the original.
pub const ORIG_BYTES: u64 = 0;
/// Command code for literal inserted bytes.
pub const INSERT_BYTES: u64 = 1;

/// Key of the command list in the envelope map.
pub const COMMANDS_KEY: &str = "cmds";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// One edit command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append `original[start..end]`.
    Copy { start: u64, end: u64 },
    /// Append these bytes.
    Insert(Vec<u8>),
}

impl Command {
    /// Bytes this command contributes to the output, if well formed.
    pub fn output_len(&self) -> u64 {
        match self {
            Self::Copy { start, end } => end.saturating_sub(*start),
            Self::Insert(data) => data.len() as u64,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Copy { start, end } => Value::Array(vec![
                Value::Integer(ORIG_BYTES.into()),
                Value::Integer((*start).into()),
                Value::Integer((*end).into()),
            ]),
            Self::Insert(data) => Value::Array(vec![
                Value::Integer(INSERT_BYTES.into()),
                Value::Bytes(data.clone()),
            ]),
        }
    }

    fn from_value(index: usize, value: &Value) -> Result<Self, EnvelopeError> {
        let bad = |reason: &'static str| EnvelopeError::BadCommand { index, reason };

        let fields = value.as_array().ok_or(bad("not an array"))?;
        let (code, args) = fields.split_first().ok_or(bad("empty command"))?;
        let code = code
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or(bad("command code is not an unsigned integer"))?;

        match code {
            ORIG_BYTES => match args {
                [start, end] => Ok(Self::Copy {
                    start: unsigned(start).ok_or(bad("copy start is not an unsigned integer"))?,
                    end: unsigned(end).ok_or(bad("copy end is not an unsigned integer"))?,
                }),
                _ => Err(bad("copy takes exactly two arguments")),
            },
            INSERT_BYTES => match args {
                [Value::Bytes(data)] => Ok(Self::Insert(data.clone())),
                [_] => Err(bad("insert argument is not a byte string")),
                _ => Err(bad("insert takes exactly one argument")),
            },
            code => Err(EnvelopeError::UnknownCommand { index, code }),
        }
    }
}

fn unsigned(value: &Value) -> Option<u64> {
    value.as_integer().and_then(|i: Integer| u64::try_from(i).ok())
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// An ordered edit script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    commands: Vec<Command>,
}

/// Summary of an edit script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub copies: usize,
    pub inserts: usize,
    pub copied_bytes: u64,
    pub inserted_bytes: u64,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Length of the buffer this script reconstructs.
    pub fn target_len(&self) -> u64 {
        self.commands.iter().map(Command::output_len).sum()
    }

    pub fn stats(&self) -> DiffStats {
        self.commands
            .iter()
            .fold(DiffStats::default(), |mut s, cmd| {
                match cmd {
                    Command::Copy { .. } => {
                        s.copies += 1;
                        s.copied_bytes += cmd.output_len();
                    }
                    Command::Insert(data) => {
                        s.inserts += 1;
                        s.inserted_bytes += data.len() as u64;
                    }
                }
                s
            })
    }

    /// Build the envelope value.
    pub fn to_value(&self) -> Value {
        Value::Map(vec![(
            Value::Text(COMMANDS_KEY.to_string()),
            Value::Array(self.commands.iter().map(Command::to_value).collect()),
        )])
    }

    /// Parse an envelope value.
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let map = value.as_map().ok_or(EnvelopeError::NotAMap)?;
        let cmds = map
            .iter()
            .find(|(k, _)| k.as_text() == Some(COMMANDS_KEY))
            .map(|(_, v)| v)
            .ok_or(EnvelopeError::MissingCommands)?;
        let cmds = cmds.as_array().ok_or(EnvelopeError::CommandsNotArray)?;

        let commands = cmds
            .iter()
            .enumerate()
            .map(|(index, v)| Command::from_value(index, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { commands })
    }

    /// Serialize to the CBOR wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&self.to_value(), &mut out)
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        Ok(out)
    }

    /// Parse the CBOR wire form. The envelope must span all of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let mut rest = bytes;
        let value: Value = ciborium::de::from_reader(&mut rest)
            .map_err(|e| EnvelopeError::InvalidCbor(e.to_string()))?;
        if !rest.is_empty() {
            return Err(EnvelopeError::TrailingBytes(rest.len()));
        }
        Self::from_value(&value)
    }
}

impl From<Vec<Command>> for Diff {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid CBOR: {0}")]
    InvalidCbor(String),
    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),
    #[error("envelope is not a map")]
    NotAMap,
    #[error("envelope has no \"cmds\" entry")]
    MissingCommands,
    #[error("\"cmds\" is not an array")]
    CommandsNotArray,
    #[error("command {index}: {reason}")]
    BadCommand { index: usize, reason: &'static str },
    #[error("command {index}: unknown command code {code}")]
    UnknownCommand { index: usize, code: u64 },
    #[error("envelope encoding failed: {0}")]
    Encode(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_value(v: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(v, &mut out).unwrap();
        out
    }

    #[test]
    fn wire_layout() {
        let diff = Diff::from(vec![
            Command::Copy { start: 0, end: 3 },
            Command::Insert(vec![0x04]),
        ]);
        let bytes = diff.to_bytes().unwrap();
        assert_eq!(
            bytes,
            [
                0xA1, 0x64, b'c', b'm', b'd', b's', // {"cmds":
                0x82, // [
                0x83, 0x00, 0x00, 0x03, // [0, 0, 3],
                0x82, 0x01, 0x41, 0x04, // [1, h'04']
            ]
        );
        assert_eq!(Diff::from_bytes(&bytes).unwrap(), diff);
    }

    #[test]
    fn empty_diff_encodes_empty_list() {
        let bytes = Diff::new().to_bytes().unwrap();
        assert_eq!(bytes, [0xA1, 0x64, b'c', b'm', b'd', b's', 0x80]);
        assert!(Diff::from_bytes(&bytes).unwrap().is_empty());
    }

    #[test]
    fn extra_keys_are_ignored() {
        let v = Value::Map(vec![
            (Value::Text("version".into()), Value::Integer(1.into())),
            (
                Value::Text("cmds".into()),
                Value::Array(vec![Value::Array(vec![
                    Value::Integer(0.into()),
                    Value::Integer(2.into()),
                    Value::Integer(5.into()),
                ])]),
            ),
        ]);
        let diff = Diff::from_bytes(&encode_value(&v)).unwrap();
        assert_eq!(diff.commands(), &[Command::Copy { start: 2, end: 5 }]);
    }

    #[test]
    fn rejects_unknown_command_code() {
        let v = Value::Map(vec![(
            Value::Text("cmds".into()),
            Value::Array(vec![Value::Array(vec![
                Value::Integer(7.into()),
                Value::Bytes(vec![1]),
            ])]),
        )]);
        assert_eq!(
            Diff::from_value(&v),
            Err(EnvelopeError::UnknownCommand { index: 0, code: 7 })
        );
    }

    #[test]
    fn rejects_malformed_shapes() {
        let cmds = |c: Value| Value::Map(vec![(Value::Text("cmds".into()), Value::Array(vec![c]))]);

        assert_eq!(
            Diff::from_value(&Value::Array(vec![])),
            Err(EnvelopeError::NotAMap)
        );
        assert_eq!(
            Diff::from_value(&Value::Map(vec![])),
            Err(EnvelopeError::MissingCommands)
        );
        assert!(matches!(
            Diff::from_value(&cmds(Value::Array(vec![
                Value::Integer(0.into()),
                Value::Integer(1.into()),
            ]))),
            Err(EnvelopeError::BadCommand { index: 0, .. })
        ));
        assert!(matches!(
            Diff::from_value(&cmds(Value::Array(vec![
                Value::Integer(0.into()),
                Value::Integer((-1).into()),
                Value::Integer(1.into()),
            ]))),
            Err(EnvelopeError::BadCommand { index: 0, .. })
        ));
        assert!(matches!(
            Diff::from_value(&cmds(Value::Array(vec![
                Value::Integer(1.into()),
                Value::Text("abc".into()),
            ]))),
            Err(EnvelopeError::BadCommand { index: 0, .. })
        ));
        assert!(matches!(
            Diff::from_value(&cmds(Value::Integer(0.into()))),
            Err(EnvelopeError::BadCommand { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_invalid_and_trailing_bytes() {
        assert!(matches!(
            Diff::from_bytes(&[0xA1, 0x64, b'c']),
            Err(EnvelopeError::InvalidCbor(_))
        ));
        let mut bytes = Diff::new().to_bytes().unwrap();
        bytes.push(0x00);
        assert_eq!(Diff::from_bytes(&bytes), Err(EnvelopeError::TrailingBytes(1)));
    }

    #[test]
    fn stats_and_target_len() {
        let diff = Diff::from(vec![
            Command::Copy { start: 0, end: 10 },
            Command::Insert(vec![1, 2, 3]),
            Command::Copy { start: 20, end: 25 },
        ]);
        assert_eq!(
            diff.stats(),
            DiffStats {
                copies: 2,
                inserts: 1,
                copied_bytes: 15,
                inserted_bytes: 3,
            }
        );
        assert_eq!(diff.target_len(), 18);
    }
}
