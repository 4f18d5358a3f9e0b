use crate::core::error::{AppError, AppResult};
use crate::models::{
    CondaInfo, CondaResponse, EnvironmentList, EnvironmentType, ManagerConfig, PackageInfo,
    PackageList, Reply, UpdateList,
};
use crate::services::salvage::clean_json;
use crate::services::version::PackageVersion;
use crate::utils::command::{CommandExecutor, CommandOutput, CommandRunner, SystemRunner};
use serde_json::Value;
use std::collections::BTreeMap;

/// conda 环境与包管理服务
///
/// 每个操作都会同步执行一次 conda 命令并阻塞到进程结束，不做超时、重试或并发协调。
pub struct EnvManager<R = SystemRunner> {
    config: ManagerConfig,
    executor: CommandExecutor<R>,
}

impl EnvManager<SystemRunner> {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            executor: CommandExecutor::new(),
        }
    }
}

impl<R: CommandRunner> EnvManager<R> {
    pub fn with_runner(config: ManagerConfig, runner: R) -> Self {
        Self {
            config,
            executor: CommandExecutor::with_runner(runner),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn executor(&self) -> &CommandExecutor<R> {
        &self.executor
    }

    fn execute<S: AsRef<str>>(&self, subcommand: &str, args: &[S]) -> AppResult<CommandOutput> {
        let command = format!("{} {}", self.config.conda_exe, subcommand);
        self.executor.execute(&command, args)
    }

    fn execute_json<S: AsRef<str>>(&self, subcommand: &str, args: &[S]) -> AppResult<Value> {
        let output = self.execute(subcommand, args)?;
        Ok(clean_json(&output))
    }

    /// 列出 conda 管理的所有环境
    pub fn list_envs(&self) -> AppResult<Reply<EnvironmentList>> {
        let data = self.execute_json::<&str>("info --json", &[])?;

        let value = match CondaResponse::classify(data) {
            CondaResponse::Error(error) => return Ok(Reply::Failed(error)),
            CondaResponse::Success(value) => value,
            other => {
                return Err(AppError::UnexpectedPayload(format!(
                    "conda info 返回了意外的结果: {other:?}"
                )))
            }
        };

        let info: CondaInfo = serde_json::from_value(value)
            .map_err(|e| AppError::UnexpectedPayload(format!("conda info 缺少必要字段: {e}")))?;

        Ok(Reply::Data(EnvironmentList::from_info(&info)))
    }

    /// 删除环境
    pub fn delete_env(&self, env: &str) -> AppResult<Value> {
        tracing::info!(env = %env, "删除环境");
        self.execute_json("env remove -y -q --json -n", &[env])
    }

    /// 导出环境的包列表（`conda list -e` 的纯文本，不做 JSON 解析）
    pub fn export_env(&self, env: &str) -> AppResult<String> {
        Ok(self.execute("list -e -n", &[env])?.into_text())
    }

    /// 克隆环境：以 `env` 为源创建名为 `name` 的新环境
    pub fn clone_env(&self, env: &str, name: &str) -> AppResult<Value> {
        tracing::info!(source = %env, target = %name, "克隆环境");
        self.execute_json("create -y -q --json -n", &[name, "--clone", env])
    }

    /// 使用给定的包列表创建环境
    pub fn create_env<S: AsRef<str>>(&self, env: &str, packages: &[S]) -> AppResult<Value> {
        tracing::info!(env = %env, packages = packages.len(), "创建环境");
        let args = with_env(env, packages);
        self.execute_json("create -y -q --json -n", &args)
    }

    /// 按预置类型（python2 / python3 / r）创建环境，未知类型返回错误
    pub fn create_env_by_type(&self, env: &str, env_type: &str) -> AppResult<Value> {
        let env_type: EnvironmentType = env_type.parse()?;
        self.create_env(env, env_type.packages())
    }

    /// 列出环境中已安装的包
    pub fn env_packages(&self, env: &str) -> AppResult<Reply<PackageList>> {
        let data = self.execute_json("list --no-pip --json -n", &[env])?;

        match CondaResponse::classify(data) {
            CondaResponse::Error(error) => Ok(Reply::Failed(error)),
            CondaResponse::Success(Value::Array(records)) => {
                let packages = records
                    .iter()
                    .map(PackageInfo::from_record)
                    .collect::<AppResult<Vec<_>>>()?;
                Ok(Reply::Data(PackageList { packages }))
            }
            other => Err(AppError::UnexpectedPayload(format!(
                "conda list 应返回包数组: {other:?}"
            ))),
        }
    }

    /// 预演更新（dry run），返回会被安装的新版本
    pub fn check_update<S: AsRef<str>>(
        &self,
        env: &str,
        packages: &[S],
    ) -> AppResult<Reply<UpdateList>> {
        let args = with_env(env, packages);
        let data = self.execute_json("update --dry-run -q --json -n", &args)?;

        match CondaResponse::classify(data) {
            CondaResponse::Error(error) => Ok(Reply::Failed(error)),
            CondaResponse::ActionPlan(links) => {
                let updates = links
                    .iter()
                    .map(parse_link)
                    .collect::<AppResult<Vec<_>>>()?;
                Ok(Reply::Data(UpdateList { updates }))
            }
            // 没有操作计划说明已经是最新
            CondaResponse::NoAction | CondaResponse::Success(_) => {
                Ok(Reply::Data(UpdateList { updates: vec![] }))
            }
        }
    }

    /// 安装包
    pub fn install_packages<S: AsRef<str>>(&self, env: &str, packages: &[S]) -> AppResult<Value> {
        tracing::info!(env = %env, packages = packages.len(), "安装包");
        self.execute_json("install -y -q --json -n", &with_env(env, packages))
    }

    /// 更新包
    pub fn update_packages<S: AsRef<str>>(&self, env: &str, packages: &[S]) -> AppResult<Value> {
        tracing::info!(env = %env, packages = packages.len(), "更新包");
        self.execute_json("update -y -q --json -n", &with_env(env, packages))
    }

    /// 卸载包
    pub fn remove_packages<S: AsRef<str>>(&self, env: &str, packages: &[S]) -> AppResult<Value> {
        tracing::info!(env = %env, packages = packages.len(), "卸载包");
        self.execute_json("remove -y -q --json -n", &with_env(env, packages))
    }

    /// 搜索包，每个包名只保留最高版本，结果按包名排序
    ///
    /// 这个操作很慢，且是同步执行的。
    pub fn package_search(&self, query: &str) -> AppResult<Reply<PackageList>> {
        let data = self.execute_json("search --json", &[query])?;

        let groups: Vec<(String, Vec<Value>)> = match CondaResponse::classify(data) {
            CondaResponse::Error(error) => return Ok(Reply::Failed(error)),
            CondaResponse::Success(Value::Object(groups)) => groups
                .into_iter()
                .map(|(name, entries)| match entries {
                    Value::Array(entries) => (name, entries),
                    single => (name, vec![single]),
                })
                .collect(),
            CondaResponse::Success(Value::Array(entries)) => group_by_name(entries),
            other => {
                return Err(AppError::UnexpectedPayload(format!(
                    "conda search 返回了意外的结果: {other:?}"
                )))
            }
        };

        let mut packages = groups
            .iter()
            .filter_map(|(_, entries)| latest_entry(entries))
            .map(PackageInfo::from_record)
            .collect::<AppResult<Vec<_>>>()?;
        packages.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Reply::Data(PackageList { packages }))
    }
}

fn with_env<S: AsRef<str>>(env: &str, packages: &[S]) -> Vec<String> {
    std::iter::once(env.to_string())
        .chain(packages.iter().map(|p| p.as_ref().to_string()))
        .collect()
}

// LINK 条目优先使用 dist_name，新版 conda 的条目本身也带有 name/version 字段
fn parse_link(link: &Value) -> AppResult<PackageInfo> {
    match link.get("dist_name").and_then(Value::as_str) {
        Some(dist_name) => PackageInfo::from_dist_name(dist_name),
        None => PackageInfo::from_record(link),
    }
}

fn group_by_name(entries: Vec<Value>) -> Vec<(String, Vec<Value>)> {
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for entry in entries {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        groups.entry(name).or_default().push(entry);
    }
    groups.into_iter().collect()
}

// 版本相同时保留先出现的条目；没有版本号的条目排在最后
fn latest_entry(entries: &[Value]) -> Option<&Value> {
    let mut best: Option<(&Value, Option<PackageVersion>)> = None;

    for entry in entries {
        let version = entry
            .get("version")
            .and_then(Value::as_str)
            .map(PackageVersion::parse);

        let is_newer = match &best {
            None => true,
            Some((_, best_version)) => version > *best_version,
        };
        if is_newer {
            best = Some((entry, version));
        }
    }

    best.map(|(entry, _)| entry)
}
