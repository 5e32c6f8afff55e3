//! 正确答案位置随机化：同组题目的正确答案序号互不相同
//!
//! 超过 4 道题时不可能做到（只有 4 个选项），原样返回。

use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::{QuizBatch, CHOICE_COUNT};

/// 用线程随机数打乱
pub fn randomize_answers(batch: QuizBatch) -> QuizBatch {
    make_answers_unique(batch, &mut rand::thread_rng())
}

/// 为每道题在未被占用的位置中均匀抽一个新序号，并把正确选项移动到该位置
pub fn make_answers_unique<R: Rng + ?Sized>(batch: QuizBatch, rng: &mut R) -> QuizBatch {
    if batch.len() > CHOICE_COUNT {
        return batch;
    }

    let mut used: Vec<u32> = Vec::with_capacity(batch.len());
    let mut out = Vec::with_capacity(batch.len());
    for mut item in batch {
        let len = item.choices.len() as u32;
        if item.answer < 1 || item.answer > len {
            out.push(item);
            continue;
        }
        let free: Vec<u32> = (1..=len).filter(|n| !used.contains(n)).collect();
        let Some(&new_answer) = free.choose(&mut *rng) else {
            out.push(item);
            continue;
        };
        used.push(new_answer);

        let correct = item.choices.remove(item.answer as usize - 1);
        item.choices.insert(new_answer as usize - 1, correct);
        item.answer = new_answer;
        out.push(item);
    }
    out
}
