use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Courses,
    Course(String),
    Leaderboard,
    Blogs,
    BlogPost(String),
    Links,
}

/// Outcome of matching a path: unknown paths land on `Home` with `redirected` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub route: Route,
    pub redirected: bool,
}

impl Route {
    pub fn parse(path: &str) -> Resolved {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            [] => Some(Route::Home),
            ["courses"] => Some(Route::Courses),
            ["course", id] => Some(Route::Course(id.to_string())),
            ["leaderboard"] => Some(Route::Leaderboard),
            ["blogs"] => Some(Route::Blogs),
            ["blogs", slug] => Some(Route::BlogPost(slug.to_string())),
            ["links"] => Some(Route::Links),
            _ => None,
        };
        match route {
            Some(route) => Resolved { route, redirected: false },
            None => Resolved { route: Route::Home, redirected: true },
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Courses => "/courses".to_string(),
            Route::Course(id) => format!("/course/{id}"),
            Route::Leaderboard => "/leaderboard".to_string(),
            Route::Blogs => "/blogs".to_string(),
            Route::BlogPost(slug) => format!("/blogs/{slug}"),
            Route::Links => "/links".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.path()) }
}
