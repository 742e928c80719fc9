//! 同类记录链表
//!
//! 表示“全部图层”“全部块记录”等有序集合。链表拥有其中的记录：
//! 链中的记录不能被单独释放，只有先 [`RecordList::remove`] 摘下（摘下即断开链接）
//! 才能得到独立的 [`Record`]。这样“释放前 next 必须为空”由所有权保证，
//! 不需要运行时检查。

use crate::record::Record;

struct Node {
    record: Record,
    next: Option<Box<Node>>,
}

/// 单向记录链表（无尾指针）
#[derive(Default)]
pub struct RecordList {
    head: Option<Box<Node>>,
    len: usize,
}

impl RecordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// 追加到链尾（线性遍历）
    pub fn append(&mut self, record: Record) {
        let mut cursor = &mut self.head;
        while let Some(node) = cursor {
            cursor = &mut node.next;
        }
        *cursor = Some(Box::new(Node { record, next: None }));
        self.len += 1;
    }

    pub fn first(&self) -> Option<&Record> {
        self.head.as_ref().map(|node| &node.record)
    }

    /// 最后一条记录（线性遍历，不缓存）
    pub fn last(&self) -> Option<&Record> {
        self.iter().last()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.iter().nth(index)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_> {
        IterMut {
            next: self.head.as_deref_mut(),
        }
    }

    /// 摘下链头
    pub fn pop_front(&mut self) -> Option<Record> {
        self.head.take().map(|node| {
            let node = *node;
            self.head = node.next;
            self.len -= 1;
            node.record
        })
    }

    /// 摘下第 `index` 条记录，前后节点重新连接
    pub fn remove(&mut self, index: usize) -> Option<Record> {
        if index >= self.len {
            return None;
        }
        let mut cursor = &mut self.head;
        for _ in 0..index {
            cursor = &mut cursor.as_mut()?.next;
        }
        let node = *cursor.take()?;
        *cursor = node.next;
        self.len -= 1;
        Some(node.record)
    }

    /// 释放全部记录，返回释放的条数
    ///
    /// 逐个断开 `next` 后再释放节点，长链也不会递归析构。
    pub fn free_all(&mut self) -> usize {
        let mut freed = 0;
        let mut cursor = self.head.take();
        while let Some(mut node) = cursor {
            cursor = node.next.take();
            drop(node);
            freed += 1;
        }
        self.len = 0;
        freed
    }
}

impl Drop for RecordList {
    fn drop(&mut self) {
        self.free_all();
    }
}

impl std::fmt::Debug for RecordList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Extend<Record> for RecordList {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        // 一次找到链尾，避免每条记录都遍历一遍
        let mut cursor = &mut self.head;
        while let Some(node) = cursor {
            cursor = &mut node.next;
        }
        for record in iter {
            let node = cursor.insert(Box::new(Node { record, next: None }));
            cursor = &mut node.next;
            self.len += 1;
        }
    }
}

impl FromIterator<Record> for RecordList {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut list = RecordList::new();
        list.extend(iter);
        list
    }
}

/// 借用遍历
pub struct Iter<'a> {
    next: Option<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|node| {
            self.next = node.next.as_deref();
            &node.record
        })
    }
}

/// 可变遍历
pub struct IterMut<'a> {
    next: Option<&'a mut Node>,
}

impl<'a> Iterator for IterMut<'a> {
    type Item = &'a mut Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.take().map(|node| {
            self.next = node.next.as_deref_mut();
            &mut node.record
        })
    }
}

/// 消耗遍历，逐条摘下
pub struct IntoIter(RecordList);

impl Iterator for IntoIter {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.pop_front()
    }
}

impl IntoIterator for RecordList {
    type Item = Record;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

impl<'a> IntoIterator for &'a RecordList {
    type Item = &'a Record;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
