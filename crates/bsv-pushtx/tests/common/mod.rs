//! A minimal opcode evaluator for running the push-tx templates in tests.
//!
//! Covers exactly the opcodes the templates and P2PKH emit. Signature checks
//! verify against a caller-supplied sighash digest instead of recomputing it.

#![allow(dead_code)]

use bsv_primitives::ec::{PublicKey, Signature};
use bsv_primitives::hash::{hash160, sha256d};
use bsv_script::opcodes::*;
use bsv_script::Script;

/// Evaluation context: the digest every OP_CHECKSIG verifies against.
pub struct Evaluator<'a> {
    digest: &'a [u8],
    stack: Vec<Vec<u8>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(digest: &'a [u8]) -> Self {
        Self { digest, stack: Vec::new() }
    }

    /// Run scripts in order on a shared stack and return the final stack.
    pub fn run(mut self, scripts: &[&Script]) -> Result<Vec<Vec<u8>>, String> {
        for script in scripts {
            self.execute(script)?;
        }
        Ok(self.stack)
    }

    fn execute(&mut self, script: &Script) -> Result<(), String> {
        let chunks = script.chunks().map_err(|e| e.to_string())?;
        let mut exec: Vec<bool> = Vec::new();

        for chunk in chunks {
            let executing = exec.iter().all(|&b| b);
            match chunk.op {
                OP_IF => {
                    let cond = if executing { is_true(&self.pop()?) } else { false };
                    exec.push(cond);
                }
                OP_ELSE => {
                    let top = exec.last_mut().ok_or("OP_ELSE without OP_IF")?;
                    *top = !*top;
                }
                OP_ENDIF => {
                    exec.pop().ok_or("OP_ENDIF without OP_IF")?;
                }
                _ if !executing => {}
                op => self.step(op, chunk.data)?,
            }
        }

        if !exec.is_empty() {
            return Err("unbalanced conditional".to_string());
        }
        Ok(())
    }

    fn step(&mut self, op: u8, data: Option<Vec<u8>>) -> Result<(), String> {
        match op {
            OP_0 => self.stack.push(Vec::new()),
            OP_DATA_1..=OP_PUSHDATA4 => self.stack.push(data.unwrap_or_default()),
            OP_1NEGATE => self.stack.push(vec![0x81]),
            OP_1..=OP_16 => self.stack.push(vec![op - OP_1 + 1]),

            OP_DUP => {
                let top = self.peek(0)?.clone();
                self.stack.push(top);
            }
            OP_DROP => {
                self.pop()?;
            }
            OP_2DROP => {
                self.pop()?;
                self.pop()?;
            }
            OP_SWAP => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(b);
                self.stack.push(a);
            }
            OP_ROT => {
                let c = self.pop()?;
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(b);
                self.stack.push(c);
                self.stack.push(a);
            }
            OP_PICK => {
                let n = self.pop_num()?;
                let n = usize::try_from(n).map_err(|_| "negative OP_PICK index")?;
                let item = self.peek(n)?.clone();
                self.stack.push(item);
            }

            OP_CAT => {
                let b = self.pop()?;
                let mut a = self.pop()?;
                a.extend_from_slice(&b);
                self.stack.push(a);
            }
            OP_SPLIT => {
                let n = self.pop_num()?;
                let data = self.pop()?;
                let n = usize::try_from(n)
                    .ok()
                    .filter(|&n| n <= data.len())
                    .ok_or_else(|| format!("OP_SPLIT index {} out of range", n))?;
                let (head, tail) = data.split_at(n);
                self.stack.push(head.to_vec());
                self.stack.push(tail.to_vec());
            }
            OP_BIN2NUM => {
                let n = decode_num(&self.pop()?)?;
                self.stack.push(encode_num(n));
            }
            OP_1ADD => {
                let n = self.pop_num()?;
                self.stack.push(encode_num(n + 1));
            }
            OP_NUMEQUAL => {
                let b = self.pop_num()?;
                let a = self.pop_num()?;
                self.stack.push(encode_bool(a == b));
            }

            OP_HASH160 => {
                let data = self.pop()?;
                self.stack.push(hash160(&data).to_vec());
            }
            OP_HASH256 => {
                let data = self.pop()?;
                self.stack.push(sha256d(&data).to_vec());
            }

            OP_EQUAL => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(encode_bool(a == b));
            }
            OP_EQUALVERIFY => {
                let b = self.pop()?;
                let a = self.pop()?;
                if a != b {
                    return Err("OP_EQUALVERIFY failed".to_string());
                }
            }
            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                let pub_key = self.pop()?;
                let sig = self.pop()?;
                let ok = self.check_sig(&sig, &pub_key);
                if op == OP_CHECKSIGVERIFY {
                    if !ok {
                        return Err("OP_CHECKSIGVERIFY failed".to_string());
                    }
                } else {
                    self.stack.push(encode_bool(ok));
                }
            }

            other => return Err(format!("unsupported opcode {:#04x}", other)),
        }
        Ok(())
    }

    fn check_sig(&self, sig: &[u8], pub_key: &[u8]) -> bool {
        let Some((_flag, der)) = sig.split_last() else {
            return false;
        };
        match (Signature::from_der(der), PublicKey::from_bytes(pub_key)) {
            (Ok(sig), Ok(key)) => key.verify(self.digest, &sig),
            _ => false,
        }
    }

    fn pop(&mut self) -> Result<Vec<u8>, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    /// Pop a numeric operand, rejecting non-minimal encodings.
    fn pop_num(&mut self) -> Result<i128, String> {
        let bytes = self.pop()?;
        check_minimal(&bytes)?;
        decode_num(&bytes)
    }

    fn peek(&self, depth: usize) -> Result<&Vec<u8>, String> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or_else(|| "stack underflow".to_string())
    }
}

/// Reject numbers with a redundant trailing zero or sign byte.
pub fn check_minimal(bytes: &[u8]) -> Result<(), String> {
    match bytes {
        [.., last] if last & 0x7f == 0 => match bytes.len() {
            1 => Err(format!("non-minimal number {:02x?}", bytes)),
            n if bytes[n - 2] & 0x80 == 0 => Err(format!("non-minimal number {:02x?}", bytes)),
            _ => Ok(()),
        },
        _ => Ok(()),
    }
}

/// Decode a little-endian sign-magnitude script number.
pub fn decode_num(bytes: &[u8]) -> Result<i128, String> {
    if bytes.len() > 16 {
        return Err(format!("number of {} bytes is too long", bytes.len()));
    }
    let Some((&last, _)) = bytes.split_last() else {
        return Ok(0);
    };
    let mut value: i128 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let b = if i == bytes.len() - 1 { b & 0x7f } else { b };
        value |= (b as i128) << (8 * i);
    }
    Ok(if last & 0x80 != 0 { -value } else { value })
}

/// Encode a script number minimally.
pub fn encode_num(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut out = Vec::new();
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    match out.last_mut() {
        Some(last) if *last & 0x80 != 0 => out.push(if negative { 0x80 } else { 0x00 }),
        Some(last) if negative => *last |= 0x80,
        _ => {}
    }
    out
}

fn encode_bool(b: bool) -> Vec<u8> {
    if b {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Script truthiness: any non-zero byte other than a lone trailing sign bit.
pub fn is_true(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .enumerate()
        .any(|(i, &b)| b != 0 && !(i == bytes.len() - 1 && b == 0x80))
}
