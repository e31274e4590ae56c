/// Process exit codes of the agent. Values are stable so supervisors can tell
/// configuration problems apart from runtime failures
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    MainEventLoopFail = 2,
    InitEventLoop = 5,
    InitMessageButton = 6,
    InitTwinStatusLed = 8,
    IsButtonPressedGetValue = 11,
    ValidateConnectionType = 12,
    ValidateScopeId = 13,
    ValidateIotHubHostname = 14,
    ValidateDeviceId = 15,
    InterfaceConnectionStatusFailed = 16,
    InitTwinRLed = 21,
    InitTwinGLed = 22,
    InitTwinBLed = 23,
    InitLogging = 24,
}

impl ExitCode {
    pub fn is_success(self) -> bool {
        self == ExitCode::Success
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
