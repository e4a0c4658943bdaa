//! 单元描述来源实现

use loader_common::{ConfigError, ConfigResult, UnitDescriptor, UnitDescriptorSource};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// properties 文件单元描述来源
///
/// 每个有效行的格式为 `name = configReference`：
///
/// - `#` 或 `!` 开头的行是注释
/// - 键值分隔符为 `=`、`:` 或空白
/// - 行尾的单个反斜杠表示续行
/// - 同名键后出现的值覆盖先前的值，位置保持首次出现的位置
#[derive(Debug, Clone)]
pub struct PropertiesDescriptorSource {
    path: PathBuf,
}

impl PropertiesDescriptorSource {
    /// 创建新的 properties 文件来源
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UnitDescriptorSource for PropertiesDescriptorSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load_descriptors(&self) -> ConfigResult<Vec<UnitDescriptor>> {
        if !self.exists() {
            return Err(ConfigError::file_not_found(self.location()));
        }

        debug!("读取单元描述文件: {}", self.path.display());
        let content = std::fs::read_to_string(&self.path)?;
        let descriptors = parse_descriptors(&content)?;

        info!(
            "单元描述文件读取完成: {}, 共 {} 个单元",
            self.path.display(),
            descriptors.len()
        );
        Ok(descriptors)
    }
}

/// 内存单元描述来源
#[derive(Debug, Clone, Default)]
pub struct StaticDescriptorSource {
    location: String,
    descriptors: Vec<UnitDescriptor>,
}

impl StaticDescriptorSource {
    /// 创建新的内存来源
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            descriptors: Vec::new(),
        }
    }

    /// 追加单元描述
    pub fn with_unit(mut self, name: impl Into<String>, config_ref: impl Into<String>) -> Self {
        self.descriptors.push(UnitDescriptor::new(name, config_ref));
        self
    }
}

impl UnitDescriptorSource for StaticDescriptorSource {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn exists(&self) -> bool {
        true
    }

    fn load_descriptors(&self) -> ConfigResult<Vec<UnitDescriptor>> {
        Ok(self.descriptors.clone())
    }
}

/// 解析 properties 格式的单元描述
pub fn parse_descriptors(content: &str) -> ConfigResult<Vec<UnitDescriptor>> {
    let mut descriptors: Vec<UnitDescriptor> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (line_no, logical) in logical_lines(content) {
        let line = logical.trim_start();
        if line.is_empty() || is_comment(line) {
            continue;
        }

        let (raw_key, raw_value) = split_key_value(line);
        let name = unescape(raw_key, line_no)?;
        let config_ref = unescape(raw_value, line_no)?.trim_end().to_string();

        if name.is_empty() {
            warn!("第 {} 行缺少单元名称，已跳过", line_no);
            continue;
        }

        if let Some(&index) = positions.get(&name) {
            debug!("单元 {} 重复定义，使用第 {} 行的值", name, line_no);
            descriptors[index].config_ref = config_ref;
        } else {
            positions.insert(name.clone(), descriptors.len());
            descriptors.push(UnitDescriptor::new(name, config_ref));
        }
    }

    Ok(descriptors)
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('!')
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// 合并续行，返回 (起始行号, 逻辑行)
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    let mut continuing = false;

    for (index, physical) in content.lines().enumerate() {
        let line_no = index + 1;
        let piece = if continuing {
            physical.trim_start()
        } else {
            start = line_no;
            if is_comment(physical.trim_start()) {
                lines.push((line_no, physical.to_string()));
                continue;
            }
            physical
        };

        if ends_with_continuation(piece) {
            current.push_str(&piece[..piece.len() - 1]);
            continuing = true;
        } else {
            current.push_str(piece);
            lines.push((start, std::mem::take(&mut current)));
            continuing = false;
        }
    }

    if continuing {
        lines.push((start, current));
    }
    lines
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = index;
                break;
            }
            c if c.is_whitespace() => {
                key_end = index;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix('=').or_else(|| rest.strip_prefix(':')) {
        rest = stripped.trim_start();
    }
    (key, rest)
}

fn unescape(raw: &str, line_no: usize) -> ConfigResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| ConfigError::InvalidDescriptor {
                        line: line_no,
                        message: format!("无效的 unicode 转义: \\u{hex}"),
                    })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}
