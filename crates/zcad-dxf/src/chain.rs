//! 续行链
//!
//! 一个字段跨多个同组码标签对时（310 二进制块、49 虚线段长度等），
//! 值按文件顺序追加到链上，而不是覆盖单个槽位。链只追加、只向前遍历，
//! 节点创建后不再修改。

use serde::Serialize;

use crate::record::Value;

/// 续行链
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Chain {
    nodes: Vec<Value>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在链尾追加一个节点
    pub fn push(&mut self, value: Value) {
        self.nodes.push(value);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 按文件顺序遍历节点
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.nodes.iter()
    }

    /// 十六进制文本节点所代表的字节数
    pub fn hex_byte_len(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().len() / 2)
            .sum()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Value> for Chain {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_order() {
        let mut chain = Chain::new();
        chain.push(Value::from("AA"));
        chain.push(Value::from("BB"));
        chain.push(Value::from("CC"));

        let nodes: Vec<_> = chain.iter().filter_map(Value::as_str).collect();
        assert_eq!(nodes, vec!["AA", "BB", "CC"]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_hex_byte_len() {
        let chain: Chain = ["0A0B0C", "FF"].into_iter().map(Value::from).collect();
        assert_eq!(chain.hex_byte_len(), 4);
        assert_eq!(Chain::new().hex_byte_len(), 0);
    }
}
