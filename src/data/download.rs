//! 数据文件的 HTTP 获取与 MD5 校验

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use md5::{Digest, Md5};
use tracing::info;

use super::error::DataError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// 单个文件的体积上限，防止异常响应占满内存
const MAX_BYTES: u64 = 64 * 1024 * 1024;

/// 把 `url` 的内容保存到 `dest`
///
/// 给出 `expected_md5` 时先校验再落盘；内容先写入同目录的 `.part` 文件，
/// 完整写完后再改名，中断的下载不会留下看似完整的文件。
pub fn download_file(url: &str, dest: &Path, expected_md5: Option<&str>) -> Result<(), DataError> {
    info!(url, "开始下载");
    let bytes = fetch(url)?;

    if let Some(expected) = expected_md5 {
        let file = dest
            .file_name()
            .map_or_else(|| url.to_string(), |n| n.to_string_lossy().into_owned());
        verify_md5(&file, &bytes, expected)?;
    }

    let partial = dest.with_extension("part");
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, dest)?;

    info!(bytes = bytes.len(), path = ?dest, "下载完成");
    Ok(())
}

fn fetch(url: &str) -> Result<Vec<u8>, DataError> {
    let failed = |reason: String| DataError::Download {
        url: url.to_string(),
        reason,
    };

    let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
    // 4xx/5xx 由 ureq 转成 Err
    let response = agent.get(url).call().map_err(|e| failed(e.to_string()))?;

    let capacity = response
        .header("Content-Length")
        .and_then(|len| len.parse::<usize>().ok())
        .unwrap_or(0);
    let mut bytes = Vec::with_capacity(capacity);
    response
        .into_reader()
        .take(MAX_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|e| failed(format!("读取响应失败: {e}")))?;
    Ok(bytes)
}

/// 校验 `data` 的 MD5（十六进制，不区分大小写）
pub fn verify_md5(file: &str, data: &[u8], expected: &str) -> Result<(), DataError> {
    let got = compute_md5(data);
    if got.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    Err(DataError::ChecksumMismatch {
        file: file.to_string(),
        expected: expected.to_string(),
        got,
    })
}

pub fn compute_md5(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}
