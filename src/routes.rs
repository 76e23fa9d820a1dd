//! Named routes of the console.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
  Login,
  Home,
  About,
  Register,
  ForgotPassword,
  UserCenter,
  DiseaseDetection,
  DetectionRecords,
  MediaLibrary,
  ModelLibrary,
  UserManagement,
  OperationLogs,
}

/// All routes, in navigation order
pub const ROUTES: &[Route] = &[
  Route::Login,
  Route::Home,
  Route::About,
  Route::Register,
  Route::ForgotPassword,
  Route::UserCenter,
  Route::DiseaseDetection,
  Route::DetectionRecords,
  Route::MediaLibrary,
  Route::ModelLibrary,
  Route::UserManagement,
  Route::OperationLogs,
];

impl Route {
  pub fn name(self) -> &'static str {
    match self {
      Route::Login => "login",
      Route::Home => "home",
      Route::About => "about",
      Route::Register => "register",
      Route::ForgotPassword => "forgot-password",
      Route::UserCenter => "user-center",
      Route::DiseaseDetection => "disease-detection",
      Route::DetectionRecords => "detection-records",
      Route::MediaLibrary => "media-library",
      Route::ModelLibrary => "model-library",
      Route::UserManagement => "user-management",
      Route::OperationLogs => "operation-logs",
    }
  }

  pub fn path(self) -> String {
    format!("/{}", self.name())
  }

  /// Resolve a path to a route. The root path redirects to login.
  pub fn resolve(path: &str) -> Option<Route> {
    let name = path.trim_end_matches('/').trim_start_matches('/');
    if name.is_empty() {
      return Some(Route::Login);
    }
    ROUTES.iter().copied().find(|r| r.name() == name)
  }
}

impl std::fmt::Display for Route {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}
