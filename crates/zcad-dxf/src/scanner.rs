//! DXF 标签扫描器
//!
//! 每个数据项由两行组成：
//! - 第一行：组码（数字，可带前导空格）
//! - 第二行：值
//!
//! 扫描器只负责按两行一组读取，不理解任何语义。组码 0 是哨兵：
//! 记录读取器读到组码 0 就停下，其后的值行（下一个记录类型或 `ENDSEC` 等）
//! 由调用方通过 [`TagScanner::read_sentinel_name`] 取走。

use std::io::{BufRead, Lines};

use crate::error::{DxfError, Result};

/// DXF 组码-值对
#[derive(Debug, Clone, PartialEq)]
pub struct DxfPair {
    pub code: i32,
    pub value: String,
}

impl DxfPair {
    pub fn new(code: i32, value: impl Into<String>) -> Self {
        Self { code, value: value.into() }
    }

    /// 解析为浮点数
    pub fn as_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }

    /// 解析为 16 位整数
    pub fn as_i16(&self) -> Option<i16> {
        self.value.trim().parse().ok()
    }

    /// 解析为整数
    pub fn as_i32(&self) -> Option<i32> {
        self.value.trim().parse().ok()
    }

    /// 解析为十六进制句柄
    pub fn as_hex(&self) -> Option<i64> {
        i64::from_str_radix(self.value.trim(), 16).ok()
    }
}

/// 标签扫描器
///
/// 只能从头开始顺序读取，行号计数随每一行递增。
pub struct TagScanner<R: BufRead> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> TagScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// 已读取的行数
    pub fn line(&self) -> usize {
        self.line
    }

    /// 读取一行，文件结束时返回 `None`
    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(Ok(mut line)) => {
                self.line += 1;
                if line.ends_with('\r') {
                    line.pop();
                }
                Ok(Some(line))
            }
            Some(Err(e)) => Err(DxfError::Io(e)),
            None => Ok(None),
        }
    }

    fn parse_code(&self, text: &str) -> Result<i32> {
        text.trim().parse().map_err(|_| DxfError::InvalidGroupCode {
            line: self.line,
            text: text.to_string(),
        })
    }

    /// 读取组码行，文件结束视为错误
    pub fn next_code(&mut self) -> Result<i32> {
        match self.next_line()? {
            Some(text) => self.parse_code(&text),
            None => Err(DxfError::UnexpectedEof { line: self.line }),
        }
    }

    /// 读取值行，文件结束视为错误
    pub fn next_value(&mut self) -> Result<String> {
        self.next_line()?
            .ok_or(DxfError::UnexpectedEof { line: self.line })
    }

    /// 读取一个完整的组码-值对
    ///
    /// 在组码行之前干净地结束时返回 `None`；在两行之间结束视为错误。
    pub fn next_pair(&mut self) -> Result<Option<DxfPair>> {
        let code = match self.next_line()? {
            Some(text) => self.parse_code(&text)?,
            None => return Ok(None),
        };
        let value = self.next_value()?;
        Ok(Some(DxfPair::new(code, value)))
    }

    /// 读取哨兵组码 0 之后的值行（下一个记录类型或段结束关键字）
    pub fn read_sentinel_name(&mut self) -> Result<Option<String>> {
        Ok(self.next_line()?.map(|s| s.trim().to_string()))
    }

    /// 向前跳到指定组码（及可选的值），成功时定位在该对之后
    pub fn skip_to(&mut self, code: i32, value: Option<&str>) -> Result<bool> {
        while let Some(pair) = self.next_pair()? {
            if pair.code == code {
                match value {
                    Some(v) if pair.value.trim() != v => continue,
                    _ => return Ok(true),
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_pair() {
        let pair = DxfPair::new(10, "100.5");
        assert_eq!(pair.as_f64(), Some(100.5));

        let pair = DxfPair::new(70, "    42");
        assert_eq!(pair.as_i32(), Some(42));
        assert_eq!(pair.as_i16(), Some(42));

        let pair = DxfPair::new(5, "1A");
        assert_eq!(pair.as_hex(), Some(26));
    }

    #[test]
    fn test_padded_codes_and_crlf() {
        let mut scanner = TagScanner::new(Cursor::new("  2\r\nFLOOR1\r\n 70\r\n     0\r\n"));
        let pair = scanner.next_pair().unwrap().unwrap();
        assert_eq!(pair, DxfPair::new(2, "FLOOR1"));
        let pair = scanner.next_pair().unwrap().unwrap();
        assert_eq!(pair.code, 70);
        assert_eq!(pair.as_i16(), Some(0));
        assert!(scanner.next_pair().unwrap().is_none());
        assert_eq!(scanner.line(), 4);
    }

    #[test]
    fn test_eof_mid_pair() {
        let mut scanner = TagScanner::new(Cursor::new("2\nNAME\n70\n"));
        scanner.next_pair().unwrap();
        let err = scanner.next_pair().unwrap_err();
        assert!(matches!(err, DxfError::UnexpectedEof { line: 3 }));
    }

    #[test]
    fn test_invalid_code() {
        let mut scanner = TagScanner::new(Cursor::new("abc\nvalue\n"));
        let err = scanner.next_pair().unwrap_err();
        assert!(matches!(err, DxfError::InvalidGroupCode { line: 1, .. }));
        assert!(err.is_stream_error());
    }

    #[test]
    fn test_sentinel_name() {
        let mut scanner = TagScanner::new(Cursor::new("  0\nLAYER\n"));
        assert_eq!(scanner.next_code().unwrap(), 0);
        assert_eq!(scanner.read_sentinel_name().unwrap().as_deref(), Some("LAYER"));
        assert_eq!(scanner.read_sentinel_name().unwrap(), None);
    }

    #[test]
    fn test_skip_to() {
        let text = "0\nSECTION\n2\nHEADER\n0\nENDSEC\n0\nSECTION\n2\nTABLES\n";
        let mut scanner = TagScanner::new(Cursor::new(text));
        assert!(scanner.skip_to(2, Some("TABLES")).unwrap());
        assert!(!scanner.skip_to(2, Some("TABLES")).unwrap());
    }
}
